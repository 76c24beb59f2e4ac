use std::future::Future;

use crate::{ErrorKind, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
	Retry,
	Degrade,
	Fail,
}

/// How a stage reacts to a failed attempt.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
	/// Extra attempts allowed after the first one.
	pub max_retries: u32,
	pub retryable: &'static [ErrorKind],
	pub degradable: &'static [ErrorKind],
}
impl RetryPolicy {
	/// A classifier that answers garbage is worked around with a plain search; one that is down is
	/// asked again once.
	pub const CLASSIFY: Self = Self {
		max_retries: 1,
		retryable: &[ErrorKind::UpstreamUnavailable],
		degradable: &[ErrorKind::MalformedResponse],
	};
	pub const EMBED_QUERY: Self =
		Self { max_retries: 1, retryable: &[ErrorKind::UpstreamUnavailable], degradable: &[] };

	/// `attempt` is the 1-based number of the attempt that just failed.
	pub fn decide(&self, kind: ErrorKind, attempt: u32) -> Decision {
		if self.degradable.contains(&kind) {
			return Decision::Degrade;
		}
		if self.retryable.contains(&kind) && attempt <= self.max_retries {
			return Decision::Retry;
		}

		Decision::Fail
	}

	pub(crate) async fn run<T, F, Fut>(&self, stage: &'static str, mut op: F) -> Result<Outcome<T>>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut attempt = 0;

		loop {
			attempt += 1;

			let err = match op().await {
				Ok(value) => return Ok(Outcome::Done(value)),
				Err(err) => err,
			};

			match self.decide(err.kind(), attempt) {
				Decision::Retry => {
					tracing::warn!(stage, attempt, error = %err, "Retrying failed call.");
				},
				Decision::Degrade => return Ok(Outcome::Degraded(err)),
				Decision::Fail => return Err(err),
			}
		}
	}
}

pub(crate) enum Outcome<T> {
	Done(T),
	Degraded(crate::Error),
}
