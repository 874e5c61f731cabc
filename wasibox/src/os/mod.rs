#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub(crate) use unix::*;

#[cfg(not(unix))]
mod unknown;
#[cfg(not(unix))]
pub(crate) use unknown::*;
