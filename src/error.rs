use core::fmt;

/// Recoverable outcomes of kernel calls.
///
/// Precondition violations (waiting from an interrupt handler, waiting while
/// already blocked, destroying a semaphore somebody still uses) are not
/// represented here: they are fatal assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// `try_wait` found no unit available.
    WouldBlock,
    /// A signal cancelled the wait.
    Interrupted,
    /// The wait deadline expired.
    TimedOut,
    /// Bad argument, or a priority-ceiling violation.
    Invalid,
    /// The object is in use and cannot be reconfigured.
    Busy,
    /// A fixed-size kernel table is full.
    NoSpace,
}

impl Error {
    /// POSIX errno value for this error (positive).
    pub const fn errno(self) -> i32 {
        match self {
            Self::WouldBlock => 11,
            Self::Interrupted => 4,
            Self::TimedOut => 110,
            Self::Invalid => 22,
            Self::Busy => 16,
            Self::NoSpace => 28,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WouldBlock => f.write_str("resource temporarily unavailable"),
            Self::Interrupted => f.write_str("wait interrupted by signal"),
            Self::TimedOut => f.write_str("wait timed out"),
            Self::Invalid => f.write_str("invalid argument"),
            Self::Busy => f.write_str("resource busy"),
            Self::NoSpace => f.write_str("kernel table full"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
