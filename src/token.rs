use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{ready, Context, Poll};

use pin_project_lite::pin_project;
use tokio::sync::futures::Notified;

use crate::state::{Shared, Take};

pin_project! {
    /// The future returned by [`Pool::token`].
    ///
    /// Resolves to `true` once a token has been taken from the pool, or to
    /// `false` once the pool has been closed and fully drained. A token is
    /// only ever removed in the same poll that resolves the future, so
    /// dropping it never loses a token.
    ///
    /// [`Pool::token`]: crate::Pool::token
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct Token<'a> {
        shared: &'a Shared,
        #[pin]
        notified: Notified<'a>,
        done: bool,
    }
}

impl<'a> Token<'a> {
    pub(crate) fn new(shared: &'a Shared) -> Self {
        Self {
            shared,
            notified: shared.available.notified(),
            done: false,
        }
    }
}

impl Future for Token<'_> {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        if *this.done {
            panic!("polled after completion");
        }

        loop {
            // Register interest before looking at the queue. A refill or close
            // landing between the check and parking would otherwise be lost.
            this.notified.as_mut().enable();

            let acquired = match this.shared.take() {
                Take::Token => true,
                Take::Closed => false,
                Take::Empty => {
                    ready!(this.notified.as_mut().poll(cx));
                    this.notified.set(this.shared.available.notified());
                    continue;
                }
            };

            *this.done = true;
            return Poll::Ready(acquired);
        }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("pool", self.shared)
            .field("done", &self.done)
            .finish()
    }
}
