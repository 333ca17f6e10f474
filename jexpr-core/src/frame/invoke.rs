//! Bounded waits on blocking remote invocations
//!
//! A method invoked in the debuggee can run forever or hit a breakpoint.
//! Frame implementations run the blocking call on a worker thread and give
//! up after the configured timeout; the worker is left to finish on its own.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};

use super::InvocationError;

/// Run `call` on a worker thread, waiting at most `timeout` for its result.
pub fn call_with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, InvocationError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, InvocationError> + Send + 'static,
{
    let (tx, rx) = bounded(1);
    thread::Builder::new()
        .name("jexpr-invoke".to_string())
        .spawn(move || {
            // The receiver is gone if we already timed out.
            let _ = tx.send(call());
        })
        .map_err(|e| InvocationError::Other(format!("failed to spawn invoker: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            log::warn!("remote invocation exceeded {:?}", timeout);
            Err(InvocationError::Timeout(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(InvocationError::Other(
            "invoker thread terminated without a result".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_call_returns_result() {
        let result = call_with_timeout(Duration::from_secs(5), || Ok(42));
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn test_errors_pass_through() {
        let result: Result<(), _> =
            call_with_timeout(Duration::from_secs(5), || Err(InvocationError::Disconnected));
        assert_eq!(result, Err(InvocationError::Disconnected));
    }

    #[test]
    fn test_slow_call_times_out() {
        let timeout = Duration::from_millis(20);
        let result = call_with_timeout(timeout, || {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        assert_eq!(result, Err(InvocationError::Timeout(timeout)));
    }
}
