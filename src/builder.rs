use crate::pool::Pool;
use crate::sender::Sender;
use crate::thread_pool::ThreadPool;
use crate::worker::Worker;

use std::env;
use std::fmt;
use std::sync::Arc;
use std::thread;

use log::trace;

/// Environment variable consulted for the default pool size.
const POOL_SIZE_ENV: &str = "LIBASYNC_NUM_THREADS";

/// Builds a thread pool with custom configuration values.
///
/// Methods can be chained in order to set the configuration values. The
/// thread pool is constructed by calling [`build`].
///
/// The default pool size is taken from the `LIBASYNC_NUM_THREADS`
/// environment variable if it is set to a positive integer (zero is clamped
/// to one), and from the number of CPUs otherwise.
///
/// [`build`]: Builder::build
///
/// # Examples
///
/// ```
/// use libasync::Builder;
///
/// let pool = Builder::new()
///     .pool_size(4)
///     .name_prefix("my-pool-")
///     .build();
///
/// pool.spawn(|| println!("called from a worker thread")).wait();
/// ```
pub struct Builder {
    /// Number of workers to spawn
    pool_size: usize,

    /// Name prefix for worker threads
    name_prefix: Option<String>,

    /// Stack size for worker threads
    stack_size: Option<usize>,
}

impl Builder {
    /// Returns a new thread pool builder initialized with default
    /// configuration values.
    pub fn new() -> Builder {
        let pool_size = parse_pool_size(env::var(POOL_SIZE_ENV).ok().as_deref())
            .unwrap_or_else(default_pool_size);

        Builder {
            pool_size,
            name_prefix: None,
            stack_size: None,
        }
    }

    /// Set the number of worker threads for the pool.
    ///
    /// The worker set is fixed for the lifetime of the pool.
    pub fn pool_size(&mut self, val: usize) -> &mut Self {
        assert!(val >= 1, "at least one thread required");

        self.pool_size = val;
        self
    }

    /// Set the name prefix of threads spawned by the pool.
    ///
    /// The worker index is appended, so a prefix of `my-pool-` yields
    /// threads named `my-pool-0`, `my-pool-1`, and so on. Without a prefix
    /// the system default naming is used.
    pub fn name_prefix<S: Into<String>>(&mut self, val: S) -> &mut Self {
        self.name_prefix = Some(val.into());
        self
    }

    /// Set the stack size (in bytes) for worker threads.
    pub fn stack_size(&mut self, val: usize) -> &mut Self {
        self.stack_size = Some(val);
        self
    }

    /// Create the configured [`ThreadPool`] and spawn its workers.
    pub fn build(&self) -> ThreadPool {
        trace!("build; num-workers={}", self.pool_size);

        let pool = Arc::new(Pool::new(self.pool_size));
        let mut threads = Vec::with_capacity(self.pool_size);

        for index in 0..self.pool_size {
            let mut thread = thread::Builder::new();

            if let Some(prefix) = &self.name_prefix {
                thread = thread.name(format!("{}{}", prefix, index));
            }

            if let Some(stack_size) = self.stack_size {
                thread = thread.stack_size(stack_size);
            }

            let pool = pool.clone();
            let handle = thread
                .spawn(move || Worker::new(pool, index).run())
                .expect("failed to spawn worker thread");

            threads.push(handle);
        }

        ThreadPool::from_parts(Sender::new(pool), threads)
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Builder")
            .field("pool_size", &self.pool_size)
            .field("name_prefix", &self.name_prefix)
            .field("stack_size", &self.stack_size)
            .finish()
    }
}

fn default_pool_size() -> usize {
    num_cpus::get().max(1)
}

/// Parse a pool size from the environment variable's value.
///
/// Returns `None` when the variable is unset, unparsable, or negative; the
/// caller then falls back to the CPU count. Zero is clamped to one.
fn parse_pool_size(val: Option<&str>) -> Option<usize> {
    let n: i64 = val?.trim().parse().ok()?;

    if n < 0 {
        return None;
    }

    Some((n as usize).max(1))
}

#[cfg(test)]
mod tests {
    use super::{parse_pool_size, Builder, POOL_SIZE_ENV};

    use std::env;

    #[test]
    fn parse_positive_value() {
        assert_eq!(Some(4), parse_pool_size(Some("4")));
        assert_eq!(Some(1), parse_pool_size(Some(" 1 ")));
    }

    #[test]
    fn parse_zero_clamps_to_one() {
        assert_eq!(Some(1), parse_pool_size(Some("0")));
    }

    #[test]
    fn parse_negative_falls_back() {
        assert_eq!(None, parse_pool_size(Some("-3")));
    }

    #[test]
    fn parse_garbage_falls_back() {
        assert_eq!(None, parse_pool_size(Some("four")));
        assert_eq!(None, parse_pool_size(Some("")));
        assert_eq!(None, parse_pool_size(Some("3.5")));
    }

    #[test]
    fn parse_unset_falls_back() {
        assert_eq!(None, parse_pool_size(None));
    }

    #[test]
    fn default_pool_size_matches_cpu_count() {
        // Only meaningful when the variable is not set in the test
        // environment.
        if env::var(POOL_SIZE_ENV).is_err() {
            assert_eq!(num_cpus::get().max(1), Builder::new().pool_size);
        }
    }
}
