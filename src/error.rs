use std::fmt;

/// Failure kinds surfaced by this crate's core: dynamic arrays, the quadtree,
/// its codec, and the renderer handoff. Programmer-error kinds (everything
/// except [`CoreError::OutOfRange`] and [`CoreError::LockTimeout`]) are meant
/// to abort the operation that raised them, not to be retried internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An array operation was given an index outside `[0, length)`.
    InvalidIndex { index: i64, length: usize },
    /// Read of a slot whose occupancy bit is clear.
    DeletedElement { index: i64 },
    /// `remove` was called on an array built with `store_occupied = false`.
    StoredVacanciesDisabled,
    /// `get_modifications` was called on an array built with
    /// `store_modifications = false`.
    StoredModificationsDisabled,
    /// A branch-only operation was called on a leaf, or vice versa.
    InvalidNodeType,
    /// A quadtree point operation targeted a coordinate outside the world.
    OutOfRange { x: i64, y: i64 },
    /// `Quadtree::new` was given a height outside `[2, 64]`.
    InvalidHeight { height: u32 },
    /// Deserialisation saw truncated input, an inconsistent header, or an
    /// unregistered tile id.
    MalformedFile(String),
    /// `geometry_lock` was not acquired within its timeout.
    LockTimeout,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidIndex { index, length } => {
                write!(f, "index {index} out of bounds for length {length}")
            }
            CoreError::DeletedElement { index } => {
                write!(f, "index {index} refers to a removed element")
            }
            CoreError::StoredVacanciesDisabled => {
                write!(f, "remove() called on an array without occupancy tracking")
            }
            CoreError::StoredModificationsDisabled => write!(
                f,
                "get_modifications() called on an array without modification logging"
            ),
            CoreError::InvalidNodeType => {
                write!(f, "operation is not valid for this node's tag")
            }
            CoreError::OutOfRange { x, y } => {
                write!(f, "point ({x}, {y}) lies outside the quadtree's world")
            }
            CoreError::InvalidHeight { height } => {
                write!(f, "quadtree height {height} outside [2, 64]")
            }
            CoreError::MalformedFile(reason) => write!(f, "malformed quadtree file: {reason}"),
            CoreError::LockTimeout => write!(f, "geometry_lock was not acquired in time"),
        }
    }
}

impl std::error::Error for CoreError {}

pub type CoreResult<T> = Result<T, CoreError>;
