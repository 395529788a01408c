//! A self-refilling pool of tokens, used to bound the rate and concurrency of
//! some protected operation.
//!
//! A [`Pool`] starts out holding `capacity` tokens. Callers take one token
//! before doing a unit of work, and never hand it back. Instead a background
//! task wakes up every `interval` and tops the pool back up with `refill`
//! tokens, never going over `capacity`. Tokens that don't fit are discarded
//! rather than saved for later.
//!
//! Since the refill task uses timing facilities from tokio, pools have to be
//! constructed within a Tokio runtime with the [`time` feature] enabled.
//!
//! <br>
//!
//! ## Usage
//!
//! ```
//! use token_pool::Pool;
//! use tokio::time::{self, Duration};
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
//! let pool = Pool::new(10, 10, Duration::from_millis(25));
//! assert_eq!(pool.num_tokens(), 10);
//!
//! for _ in 0..5 {
//!     assert!(pool.token().await);
//! }
//!
//! assert_eq!(pool.num_tokens(), 5);
//!
//! pool.drain();
//! assert_eq!(pool.num_tokens(), 0);
//!
//! // One refill happens within this window, which fills the pool back up.
//! time::sleep(Duration::from_millis(35)).await;
//! assert_eq!(pool.num_tokens(), 10);
//! # }
//! ```
//!
//! <br>
//!
//! ## Acquiring tokens
//!
//! There are a couple of ways to take a token:
//!
//! * [`Pool::token`] suspends the current task until a token is available. It
//!   only resolves to `false` once the pool has been [closed] and all of its
//!   remaining tokens have been taken.
//! * [`Pool::try_token`] never suspends.
//! * [`Pool::acquire`] suspends until either a token is available or the
//!   provided cancellation future completes. [`Pool::acquire_timeout`] and
//!   [`Pool::acquire_until`] use a deadline as the cancellation.
//! * [`Pool::blocking_token`] blocks the current thread, for use outside of
//!   asynchronous code.
//!
//! A token is only removed from the pool in the same poll that resolves an
//! acquisition to `true`. So an acquisition which is cancelled, either
//! through [`Pool::acquire`] or by dropping its future, never consumes a
//! token.
//!
//! ```
//! use token_pool::Pool;
//! use tokio::time::{Duration, Instant};
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
//! let pool = Pool::new(1, 0, Duration::from_millis(25));
//! assert!(pool.token().await);
//!
//! // No refill ever happens, so this times out.
//! let start = Instant::now();
//! assert!(!pool.acquire_timeout(Duration::from_millis(30)).await);
//! assert!(start.elapsed() >= Duration::from_millis(30));
//! # }
//! ```
//!
//! <br>
//!
//! ## Closing
//!
//! [`Pool::close`] stops any further refills. Tokens which are already in the
//! pool can still be taken, after which every acquisition fails.
//!
//! ```
//! use token_pool::Pool;
//! use tokio::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
//! let pool = Pool::new(2, 2, Duration::from_millis(25));
//! pool.close();
//! pool.close();
//!
//! assert!(pool.token().await);
//! assert!(pool.try_token());
//! assert!(!pool.token().await);
//! assert!(!pool.try_token());
//! # }
//! ```
//!
//! <br>
//!
//! ## Fairness
//!
//! Pools are *unfair*. When tokens are added, every task waiting for one is
//! woken up and they race to take them, so there's no guarantee that the task
//! which has waited the longest gets served first. Callers of
//! [`Pool::try_token`] also compete on equal terms with waiting tasks.
//!
//! [closed]: Pool::close
//! [`time` feature]: https://docs.rs/tokio/1/tokio/#feature-flags

#![deny(missing_docs)]

#[cfg(feature = "tracing")]
macro_rules! trace {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! debug {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

mod error;
mod refill;
mod state;
mod token;

pub use self::error::Error;
pub use self::token::Token;

use core::fmt;
use core::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};

use self::state::{Shared, Take};

/// Default factor for how to calculate the capacity from the refill amount.
const DEFAULT_CAPACITY_FACTOR: usize = 10;

/// A self-refilling pool of tokens.
///
/// See the [crate documentation](crate) for an overview.
pub struct Pool {
    shared: Arc<Shared>,
    /// Handle to the refill task.
    task: JoinHandle<()>,
}

impl Pool {
    /// Construct a new pool holding `capacity` tokens, which adds `refill`
    /// tokens every `interval`.
    ///
    /// A `refill` of `0` disables automatic refills.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` or `interval` is zero, or if called outside of a
    /// Tokio runtime. See [`Builder::try_build`] for a non-panicking
    /// alternative.
    ///
    /// # Examples
    ///
    /// ```
    /// use token_pool::Pool;
    /// use tokio::time::Duration;
    ///
    /// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
    /// let pool = Pool::new(100, 10, Duration::from_millis(250));
    ///
    /// assert_eq!(pool.capacity(), 100);
    /// assert_eq!(pool.num_tokens(), 100);
    /// # }
    /// ```
    pub fn new(capacity: usize, refill: usize, interval: Duration) -> Self {
        Self::builder()
            .capacity(capacity)
            .refill(refill)
            .interval(interval)
            .build()
    }

    /// Construct a new [`Builder`] for a [`Pool`].
    ///
    /// # Examples
    ///
    /// ```
    /// use token_pool::Pool;
    /// use tokio::time::Duration;
    ///
    /// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
    /// let pool = Pool::builder()
    ///     .capacity(1000)
    ///     .refill(100)
    ///     .interval(Duration::from_millis(250))
    ///     .build();
    /// # }
    /// ```
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Take a single token, suspending the current task until one is
    /// available.
    ///
    /// The returned future resolves to `false` only once the pool has been
    /// [closed] and every remaining token has been taken. Any number of tasks
    /// may wait at the same time, but each token is handed to exactly one of
    /// them.
    ///
    /// [closed]: Pool::close
    ///
    /// # Examples
    ///
    /// ```
    /// use token_pool::Pool;
    /// use tokio::time::{Duration, Instant};
    ///
    /// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
    /// let pool = Pool::new(1, 1, Duration::from_millis(100));
    /// let start = Instant::now();
    ///
    /// assert!(pool.token().await);
    /// // This one has to wait for the next refill.
    /// assert!(pool.token().await);
    ///
    /// assert!(start.elapsed() >= Duration::from_millis(100));
    /// # }
    /// ```
    pub fn token(&self) -> Token<'_> {
        Token::new(&self.shared)
    }

    /// Take a single token, blocking the current thread until one is
    /// available.
    ///
    /// This is the synchronous counterpart of [`Pool::token`], for use in
    /// threads which aren't driven by an asynchronous runtime.
    ///
    /// # Panics
    ///
    /// Panics if called from within a Tokio runtime context, including
    /// [`spawn_blocking`] tasks. Blocking a runtime thread might prevent the
    /// refill task from ever running. Use a plain thread or [`Pool::token`]
    /// instead.
    ///
    /// [`spawn_blocking`]: tokio::task::spawn_blocking
    ///
    /// # Examples
    ///
    /// ```
    /// use std::thread;
    /// use token_pool::Pool;
    /// use tokio::time::Duration;
    ///
    /// # fn main() -> std::io::Result<()> {
    /// let runtime = tokio::runtime::Runtime::new()?;
    /// let pool = {
    ///     let _guard = runtime.enter();
    ///     Pool::new(1, 1, Duration::from_millis(10))
    /// };
    ///
    /// thread::scope(|s| {
    ///     s.spawn(|| {
    ///         assert!(pool.blocking_token());
    ///         assert!(pool.blocking_token());
    ///     });
    /// });
    /// # Ok(()) }
    /// ```
    pub fn blocking_token(&self) -> bool {
        if Handle::try_current().is_ok() {
            panic!("cannot block the current thread from within a Tokio runtime");
        }

        futures::executor::block_on(self.token())
    }

    /// Try to take a single token without suspending, returning `true` if one
    /// was taken.
    ///
    /// Tokens left in the pool after it has been [closed] can still be taken.
    ///
    /// [closed]: Pool::close
    ///
    /// # Examples
    ///
    /// ```
    /// use token_pool::Pool;
    /// use tokio::time::Duration;
    ///
    /// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
    /// let pool = Pool::new(2, 0, Duration::from_millis(25));
    ///
    /// assert!(pool.try_token());
    /// assert!(pool.try_token());
    /// assert!(!pool.try_token());
    /// # }
    /// ```
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", ret))]
    pub fn try_token(&self) -> bool {
        matches!(self.shared.take(), Take::Token)
    }

    /// Take a single token, suspending the current task until either one is
    /// available or `cancel` completes.
    ///
    /// Returns `true` if a token was taken. If `cancel` completes first this
    /// returns `false` without having consumed a token. If a token and the
    /// cancellation are both ready at the same time, the token is taken.
    ///
    /// Like [`Pool::token`], this also returns `false` once the pool is closed
    /// and drained.
    ///
    /// # Examples
    ///
    /// ```
    /// use token_pool::Pool;
    /// use tokio::sync::oneshot;
    /// use tokio::time::Duration;
    ///
    /// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
    /// let pool = Pool::new(1, 0, Duration::from_millis(25));
    /// pool.drain();
    ///
    /// let (cancel, cancelled) = oneshot::channel::<()>();
    /// drop(cancel);
    ///
    /// assert!(!pool.acquire(cancelled).await);
    /// # }
    /// ```
    pub async fn acquire<F>(&self, cancel: F) -> bool
    where
        F: Future,
    {
        tokio::select! {
            biased;
            acquired = self.token() => acquired,
            _ = cancel => {
                trace!("acquire cancelled");
                false
            }
        }
    }

    /// Take a single token, waiting at most `timeout` for one to become
    /// available.
    ///
    /// This is [`Pool::acquire`] with a sleep as the cancellation.
    ///
    /// # Examples
    ///
    /// ```
    /// use token_pool::Pool;
    /// use tokio::time::Duration;
    ///
    /// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
    /// let pool = Pool::new(1, 1, Duration::from_millis(50));
    /// pool.drain();
    ///
    /// assert!(!pool.acquire_timeout(Duration::from_millis(10)).await);
    /// assert!(pool.acquire_timeout(Duration::from_millis(100)).await);
    /// # }
    /// ```
    pub async fn acquire_timeout(&self, timeout: Duration) -> bool {
        self.acquire(time::sleep(timeout)).await
    }

    /// Take a single token, waiting until `deadline` at the latest for one to
    /// become available.
    ///
    /// This is [`Pool::acquire`] with a sleep as the cancellation.
    pub async fn acquire_until(&self, deadline: Instant) -> bool {
        self.acquire(time::sleep_until(deadline)).await
    }

    /// Remove every token currently in the pool without suspending, returning
    /// how many were removed.
    ///
    /// The pool stays empty until the next refill, or forever if it has been
    /// closed.
    ///
    /// # Examples
    ///
    /// ```
    /// use token_pool::Pool;
    /// use tokio::time::Duration;
    ///
    /// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
    /// let pool = Pool::new(10, 10, Duration::from_millis(25));
    ///
    /// assert_eq!(pool.drain(), 10);
    /// assert_eq!(pool.num_tokens(), 0);
    /// assert!(!pool.try_token());
    /// # }
    /// ```
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace"))]
    pub fn drain(&self) -> usize {
        self.shared.drain()
    }

    /// Get the number of tokens currently in the pool.
    ///
    /// This is just a snapshot. Other tasks and the refill task might change
    /// it at any time, so it can't be used to tell if a following acquisition
    /// will succeed.
    pub fn num_tokens(&self) -> usize {
        self.shared.len()
    }

    /// Get the capacity of this pool as set through [`Builder::capacity`].
    ///
    /// # Examples
    ///
    /// ```
    /// use token_pool::Pool;
    ///
    /// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
    /// let pool = Pool::builder().capacity(1024).build();
    ///
    /// assert_eq!(pool.capacity(), 1024);
    /// # }
    /// ```
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Get the refill amount of this pool as set through [`Builder::refill`].
    #[inline]
    pub fn refill(&self) -> usize {
        self.shared.refill
    }

    /// Get the refill interval of this pool as set through
    /// [`Builder::interval`].
    #[inline]
    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// Test if [`Pool::close`] has been called.
    ///
    /// Tokens might still be available even if this returns `true`.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closing()
    }

    /// Close the pool.
    ///
    /// This stops any further refills. Tokens which are already in the pool
    /// can still be taken, once they're gone every acquisition fails.
    ///
    /// Closing never suspends and may be called any number of times from any
    /// number of tasks, only the first call has an effect. A closed pool can't
    /// be reopened.
    ///
    /// Parked acquisitions are woken before this returns, so they observe the
    /// close even if the runtime driving the refill task is gone.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace"))]
    pub fn close(&self) {
        if self.shared.close() {
            debug!("close requested");
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        // Nothing can be waiting on the pool since acquisitions borrow it.
        self.task.abort();
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.shared.fmt(f)
    }
}

/// A builder for a [`Pool`].
pub struct Builder {
    /// The max number of tokens.
    capacity: Option<usize>,
    /// Tokens to add every `interval`.
    refill: usize,
    /// Time between refills.
    interval: Duration,
}

impl Builder {
    /// Configure the max number of tokens the pool holds. The pool starts out
    /// with this many tokens.
    ///
    /// If unspecified, this will default to be 10 times the [`refill`] value.
    ///
    /// # Examples
    ///
    /// ```
    /// use token_pool::Pool;
    ///
    /// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
    /// let pool = Pool::builder()
    ///     .capacity(10_000)
    ///     .build();
    /// # }
    /// ```
    ///
    /// [`refill`]: Builder::refill
    pub fn capacity(&mut self, capacity: usize) -> &mut Self {
        self.capacity = Some(capacity);
        self
    }

    /// The number of tokens to add at each [`interval`]. The default value is
    /// `1`.
    ///
    /// A value of `0` disables automatic refills, so the pool only ever hands
    /// out its initial tokens.
    ///
    /// # Examples
    ///
    /// ```
    /// use token_pool::Pool;
    ///
    /// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
    /// let pool = Pool::builder()
    ///     .refill(100)
    ///     .build();
    ///
    /// assert_eq!(pool.capacity(), 1000);
    /// # }
    /// ```
    ///
    /// [`interval`]: Builder::interval
    pub fn refill(&mut self, refill: usize) -> &mut Self {
        self.refill = refill;
        self
    }

    /// Configure the time between which we add [`refill`] tokens to the pool.
    ///
    /// This is 100ms by default.
    ///
    /// # Examples
    ///
    /// ```
    /// use token_pool::Pool;
    /// use tokio::time::Duration;
    ///
    /// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
    /// let pool = Pool::builder()
    ///     .interval(Duration::from_millis(25))
    ///     .build();
    ///
    /// assert_eq!(pool.interval(), Duration::from_millis(25));
    /// # }
    /// ```
    ///
    /// [`refill`]: Builder::refill
    pub fn interval(&mut self, interval: Duration) -> &mut Self {
        self.interval = interval;
        self
    }

    /// Construct a new [`Pool`] and spawn its refill task on the current Tokio
    /// runtime.
    ///
    /// # Panics
    ///
    /// Panics if the capacity or interval is zero, or if called outside of a
    /// Tokio runtime. See [`Builder::try_build`] for a non-panicking
    /// alternative.
    pub fn build(&self) -> Pool {
        match self.try_build() {
            Ok(pool) => pool,
            Err(error) => panic!("{}", error),
        }
    }

    /// Try to construct a new [`Pool`] and spawn its refill task on the
    /// current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Errors with [`Error::ZeroCapacity`] or [`Error::ZeroInterval`] if
    /// either is configured to zero, and with [`Error::NoRuntime`] if called
    /// outside of a Tokio runtime.
    ///
    /// # Examples
    ///
    /// ```
    /// use token_pool::{Error, Pool};
    ///
    /// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
    /// let error = Pool::builder().capacity(0).try_build().unwrap_err();
    /// assert_eq!(error, Error::ZeroCapacity);
    /// # }
    /// ```
    pub fn try_build(&self) -> Result<Pool, Error> {
        let Self {
            capacity,
            refill,
            interval,
        } = *self;

        let capacity =
            capacity.unwrap_or_else(|| refill.saturating_mul(DEFAULT_CAPACITY_FACTOR));

        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }

        if interval.is_zero() {
            return Err(Error::ZeroInterval);
        }

        let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let shared = Arc::new(Shared::new(capacity, refill, interval));
        let task = handle.spawn(refill::run(shared.clone()));

        debug!(capacity, refill, ?interval, "pool created");
        Ok(Pool { shared, task })
    }
}

/// Construct a new builder with default options.
///
/// # Examples
///
/// ```
/// use token_pool::Builder;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)] async fn main() {
/// let pool = Builder::default().build();
/// assert_eq!(pool.capacity(), 10);
/// # }
/// ```
impl Default for Builder {
    fn default() -> Self {
        Self {
            capacity: None,
            refill: 1,
            interval: Duration::from_millis(100),
        }
    }
}
