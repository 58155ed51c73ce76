use std::fmt;

/// Status of a drawing object.
///
/// Every fallible operation in this library reports failure through a
/// `Status`. Contexts, surfaces, patterns, and fonts additionally keep an
/// object-local status: once an object enters an error status, subsequent
/// operations on it become no-ops that preserve the first error. Callers
/// inspect it through the object's `status()` accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Memory could not be allocated for the operation
    NoMemory,

    /// `restore` called without a matching `save`
    InvalidRestore,

    /// `pop_group` called without a matching `push_group`
    InvalidPopGroup,

    /// The operation requires a current point and the path has none
    NoCurrentPoint,

    /// The matrix is not invertible
    InvalidMatrix,

    /// An invalid status value was passed through
    InvalidStatus,

    /// Required input was missing
    NullPointer,

    /// Input string was not valid UTF-8
    InvalidString,

    /// Path data was malformed
    InvalidPathData,

    /// Error while reading from an input stream
    ReadError,

    /// Error while writing to an output stream
    WriteError,

    /// The target surface has been finished
    SurfaceFinished,

    /// The surface type is not appropriate for the operation
    SurfaceTypeMismatch,

    /// The pattern type is not appropriate for the operation
    PatternTypeMismatch,

    /// Invalid value for surface content
    InvalidContent,

    /// Invalid value for a pixel format
    InvalidFormat,

    /// The named file could not be found
    FileNotFound,

    /// Invalid value in a dash setting
    InvalidDash,

    /// Index passed to a getter is out of range
    InvalidIndex,

    /// The clip region cannot be represented in the requested form
    ClipNotRepresentable,

    /// Invalid value for an image stride
    InvalidStride,

    /// The font type is not appropriate for the operation
    FontTypeMismatch,

    /// The user font may no longer be modified
    UserFontImmutable,

    /// A user-font callback reported failure
    UserFontError,

    /// A negative count was used where it is not allowed
    NegativeCount,

    /// Clusters do not describe the accompanying text and glyphs
    InvalidClusters,

    /// Invalid value for a font slant
    InvalidSlant,

    /// Invalid value for a font weight
    InvalidWeight,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Status::NoMemory => "out of memory",
            Status::InvalidRestore => "restore without matching save",
            Status::InvalidPopGroup => "no saved group to pop to",
            Status::NoCurrentPoint => "no current point defined",
            Status::InvalidMatrix => "invalid matrix (not invertible)",
            Status::InvalidStatus => "invalid status value",
            Status::NullPointer => "required input was missing",
            Status::InvalidString => "input string not valid UTF-8",
            Status::InvalidPathData => "input path data not valid",
            Status::ReadError => "error while reading from input stream",
            Status::WriteError => "error while writing to output stream",
            Status::SurfaceFinished => "the target surface has been finished",
            Status::SurfaceTypeMismatch => {
                "the surface type is not appropriate for the operation"
            }
            Status::PatternTypeMismatch => {
                "the pattern type is not appropriate for the operation"
            }
            Status::InvalidContent => "invalid value for surface content",
            Status::InvalidFormat => "invalid value for pixel format",
            Status::FileNotFound => "file not found",
            Status::InvalidDash => "invalid value for a dash setting",
            Status::InvalidIndex => "invalid index passed to getter",
            Status::ClipNotRepresentable => {
                "clip region not representable in desired format"
            }
            Status::InvalidStride => "invalid value for stride",
            Status::FontTypeMismatch => {
                "the font type is not appropriate for the operation"
            }
            Status::UserFontImmutable => "the user font is immutable",
            Status::UserFontError => "error occurred in a user-font callback",
            Status::NegativeCount => "negative number used where it is not allowed",
            Status::InvalidClusters => {
                "clusters do not represent the accompanying text and glyphs"
            }
            Status::InvalidSlant => "invalid value for a font slant",
            Status::InvalidWeight => "invalid value for a font weight",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Status {}

/// Result type alias for drawing operations
pub type Result<T> = std::result::Result<T, Status>;
