//! Time-injected event coalescing.
//!
//! Both coalescers are pure: the host passes the current time in milliseconds
//! and arms a timer for [`Throttle::deadline`] / [`Debounce::deadline`]. When
//! the timer fires it calls `poll` with the new time.

/// Leading-edge throttle with a trailing flush. The latest value offered
/// inside an interval replaces any earlier pending one.
#[derive(Clone, Debug)]
pub struct Throttle<T> {
	interval_ms: f64,
	last_emit: Option<f64>,
	pending: Option<T>,
}

impl<T> Throttle<T> {
	/// Throttle emitting at most once per `interval_ms`.
	pub fn new(interval_ms: f64) -> Self {
		Self {
			interval_ms,
			last_emit: None,
			pending: None,
		}
	}

	/// Offer a value. Returns it immediately if the interval has elapsed,
	/// otherwise keeps it pending.
	pub fn offer(&mut self, now: f64, value: T) -> Option<T> {
		if self.ready(now) {
			self.last_emit = Some(now);
			self.pending = None;
			Some(value)
		} else {
			self.pending = Some(value);
			None
		}
	}

	/// Emit the pending value once its interval has elapsed.
	pub fn poll(&mut self, now: f64) -> Option<T> {
		if self.pending.is_some() && self.ready(now) {
			self.last_emit = Some(now);
			self.pending.take()
		} else {
			None
		}
	}

	/// Time at which a pending value becomes due.
	pub fn deadline(&self) -> Option<f64> {
		self.pending.as_ref()?;
		Some(self.last_emit.map_or(0.0, |t| t + self.interval_ms))
	}

	/// Whether a value is waiting for its interval.
	pub fn has_pending(&self) -> bool {
		self.pending.is_some()
	}

	/// Emit the pending value now, e.g. when the gesture producing it ends.
	pub fn flush(&mut self, now: f64) -> Option<T> {
		let value = self.pending.take()?;
		self.last_emit = Some(now);
		Some(value)
	}

	/// Drop any pending value.
	pub fn cancel(&mut self) {
		self.pending = None;
	}

	fn ready(&self, now: f64) -> bool {
		self.last_emit
			.is_none_or(|last| now - last >= self.interval_ms)
	}
}

/// Trailing-edge debounce: a value is emitted only after `delay_ms` without
/// a newer offer.
#[derive(Clone, Debug)]
pub struct Debounce<T> {
	delay_ms: f64,
	last_offer: f64,
	pending: Option<T>,
}

impl<T> Debounce<T> {
	/// Debounce emitting `delay_ms` after the last offer.
	pub fn new(delay_ms: f64) -> Self {
		Self {
			delay_ms,
			last_offer: 0.0,
			pending: None,
		}
	}

	/// Replace the pending value and restart the delay.
	pub fn offer(&mut self, now: f64, value: T) {
		self.last_offer = now;
		self.pending = Some(value);
	}

	/// Emit the pending value once the delay has passed.
	pub fn poll(&mut self, now: f64) -> Option<T> {
		if now - self.last_offer >= self.delay_ms {
			self.pending.take()
		} else {
			None
		}
	}

	/// Time at which the pending value becomes due.
	pub fn deadline(&self) -> Option<f64> {
		self.pending.as_ref().map(|_| self.last_offer + self.delay_ms)
	}

	/// Emit the pending value regardless of the delay.
	pub fn flush(&mut self) -> Option<T> {
		self.pending.take()
	}

	/// Drop any pending value.
	pub fn cancel(&mut self) {
		self.pending = None;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn throttle_emits_leading_and_trailing() {
		let mut t = Throttle::new(100.0);
		assert_eq!(t.offer(0.0, 1), Some(1));
		assert_eq!(t.offer(10.0, 2), None);
		assert_eq!(t.offer(20.0, 3), None);
		assert_eq!(t.deadline(), Some(100.0));
		assert_eq!(t.poll(50.0), None);
		assert_eq!(t.poll(100.0), Some(3));
		assert_eq!(t.poll(300.0), None);
		assert_eq!(t.offer(300.0, 4), Some(4));
	}

	#[test]
	fn throttle_cancel_drops_pending() {
		let mut t = Throttle::new(100.0);
		t.offer(0.0, 1);
		t.offer(1.0, 2);
		t.cancel();
		assert!(!t.has_pending());
		assert_eq!(t.poll(500.0), None);
		assert_eq!(t.deadline(), None);
	}

	#[test]
	fn throttle_flush_emits_latest() {
		let mut t = Throttle::new(100.0);
		assert_eq!(t.offer(0.0, 1), Some(1));
		t.offer(5.0, 2);
		assert_eq!(t.flush(6.0), Some(2));
		assert_eq!(t.flush(7.0), None);
		assert_eq!(t.offer(50.0, 3), None);
	}

	#[test]
	fn debounce_waits_for_quiet_period() {
		let mut d = Debounce::new(150.0);
		d.offer(0.0, "a");
		d.offer(100.0, "b");
		assert_eq!(d.poll(200.0), None);
		assert_eq!(d.deadline(), Some(250.0));
		assert_eq!(d.poll(250.0), Some("b"));
		assert_eq!(d.poll(400.0), None);
	}

	#[test]
	fn debounce_flush_and_cancel() {
		let mut d = Debounce::new(150.0);
		d.offer(0.0, 1);
		assert_eq!(d.flush(), Some(1));
		d.offer(10.0, 2);
		d.cancel();
		assert_eq!(d.poll(1000.0), None);
	}
}
