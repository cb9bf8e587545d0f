use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The taxonomy mirrors the bridge's failure policy: every resolution failure
/// (mapping, overload, patch target) is fatal at the point of first use, because a wrong
/// guess against an obfuscated binary corrupts state rather than merely degrading a
/// feature. Only [`Error::TargetInvocation`] represents a failure inside the wrapped
/// binary's own logic and may reasonably be caught and reported by a caller.
///
/// # Error Categories
///
/// ## Mapping Resolution
/// - [`Error::MappingLoad`] - Mapping set missing, structurally invalid, or loaded twice
/// - [`Error::UnmappedClass`] - No mapping for a logical class name
/// - [`Error::UnmappedSymbol`] - No mapping for a logical field/method on a mapped class
///
/// ## Reflective Dispatch
/// - [`Error::NoMatchingOverload`] - No member matches the given name and argument types
/// - [`Error::AmbiguousOverload`] - Two or more members match equally well
/// - [`Error::TargetInvocation`] - The invoked target implementation itself failed
/// - [`Error::UnsupportedCopy`] - Proxy field-copy was requested but is rejected
///
/// ## Patch Pipeline
/// - [`Error::Extraction`] - I/O failure while unpacking the target archive
/// - [`Error::PatchTargetNotFound`] - A patch unit's class or member does not exist
/// - [`Error::StartupOrder`] - Pipeline phases executed out of order, or registration
///   attempted after class loading already began
///
/// ## Classfile Parsing
/// - [`Error::Malformed`] - Corrupted or invalid classfile structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a classfile
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::ZipError`] - Archive parsing errors from the zip crate
#[derive(Error, Debug)]
pub enum Error {
    /// The mapping set could not be loaded.
    ///
    /// Raised when no mapping data exists for the requested version key, when the
    /// set is structurally invalid (duplicate logical signature within one owner,
    /// member entry whose owner class is never mapped), or when a second load is
    /// attempted with a different version key than the first. All of these abort
    /// process startup; there is no partial-bridge degraded mode.
    #[error("Mapping load failed - {0}")]
    MappingLoad(String),

    /// No mapping exists for the given logical class name.
    ///
    /// Fatal by default: silently falling back to the logical name is only ever
    /// acceptable for diagnostic output, never for dispatch.
    #[error("No mapping for class '{0}'")]
    UnmappedClass(String),

    /// No mapping exists for the given logical field or method on a mapped class.
    #[error("No mapping for symbol '{symbol}' on class '{class}'")]
    UnmappedSymbol {
        /// Logical name of the owning class
        class: String,
        /// Logical field name or method signature that failed to resolve
        symbol: String,
    },

    /// No member on the declaring class matches the name, arity and argument types.
    #[error("No overload of '{method}' on '{class}' accepts {arity} argument(s) of the given types")]
    NoMatchingOverload {
        /// Runtime name of the declaring class
        class: String,
        /// Logical method name as requested by the caller
        method: String,
        /// Number of arguments supplied
        arity: usize,
    },

    /// More than one member matches the call equally well.
    ///
    /// The bridge never picks arbitrarily between equally-specific overloads; the
    /// caller must disambiguate by adjusting argument types.
    #[error("Ambiguous call to '{method}' on '{class}': {candidates} overloads match equally well")]
    AmbiguousOverload {
        /// Runtime name of the declaring class
        class: String,
        /// Logical method name as requested by the caller
        method: String,
        /// Number of equally-specific candidates
        candidates: usize,
    },

    /// The underlying target implementation raised a failure.
    ///
    /// Wraps the original cause and is never swallowed silently. This is the one
    /// category a caller may catch and report without terminating the process,
    /// since it represents a defect inside the wrapped binary's own logic rather
    /// than a bridge-construction defect.
    #[error("Target invocation failed: {0}")]
    TargetInvocation(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Proxy construction requested field copying from a source instance.
    ///
    /// Copy-on-create is rejected by design rather than silently skipped; see the
    /// proxy module documentation for the rationale.
    #[error("Copying fields into a new proxy instance is not supported")]
    UnsupportedCopy,

    /// I/O failure while extracting the target archive into the scratch directory.
    ///
    /// Partial extraction is not a valid state to proceed from; the whole pipeline
    /// aborts.
    #[error("Extraction of '{path}' failed: {source}")]
    Extraction {
        /// Archive or entry path that failed to extract
        path: String,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// A patch unit's target class or member could not be located.
    ///
    /// Fatal: a missing patch target means the runtime hook it installs would never
    /// fire, and the adapter would silently lose functionality if allowed to
    /// continue.
    #[error("Patch target not found: '{member}' on '{class}'")]
    PatchTargetNotFound {
        /// Class the patch unit targets
        class: String,
        /// Member name and descriptor that could not be located
        member: String,
    },

    /// Startup phases were executed out of order.
    ///
    /// Covers pipeline transitions taken out of sequence and attempts to register
    /// the scratch directory after class loading has already begun. Fatal at
    /// startup, never a recoverable runtime error.
    #[error("Startup ordering violation: {0}")]
    StartupOrder(String),

    /// No entry on the class search path provides the requested class.
    ///
    /// Raised with the internal (slash-separated) class name that failed to
    /// resolve against every registered classpath entry.
    #[error("Class '{0}' not found on the class search path")]
    ClassNotFound(String),

    /// A classfile is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing a classfile.
    #[error("Out of bound read would have occurred!")]
    OutOfBounds,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during file operations such as
    /// reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the zip crate while reading the target archive.
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    /// General error during type system usage.
    ///
    /// Covers descriptor parsing failures, coercion failures and other type
    /// operations that cannot be completed.
    #[error("{0}")]
    TypeError(String),

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories, such as invoking a
    /// method that has no implementation bound by the host.
    #[error("{0}")]
    Error(String),
}
