//! Bounded single-producer/single-consumer frame hand-off.
//!
//! The producer never blocks on a full channel: the configured
//! [`OverflowPolicy`] decides which frame is discarded instead. The consumer
//! waits with a bounded timeout so it can periodically re-check shutdown
//! state, and `close` wakes it immediately.

use color_eyre::eyre::{bail, Result};
use parking_lot::{Condvar, Mutex};
use std::{
	collections::VecDeque,
	time::{Duration, Instant},
};

/// What `push` does when the channel is already at capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum OverflowPolicy {
	/// Evict buffered frames from the front until the new one fits.
	#[default]
	DropOldest,
	/// Keep what is buffered and discard the incoming frame.
	DropNewest,
}

struct State<T> {
	queue: VecDeque<T>,
	closed: bool,
	dropped: u64,
}

pub struct FrameChannel<T> {
	state: Mutex<State<T>>,
	ready: Condvar,
	capacity: usize,
	policy: OverflowPolicy,
}

impl<T> FrameChannel<T> {
	pub fn new(capacity: usize) -> Result<Self> {
		Self::with_policy(capacity, OverflowPolicy::default())
	}

	pub fn with_policy(capacity: usize, policy: OverflowPolicy) -> Result<Self> {
		if capacity == 0 {
			bail!("frame channel capacity must be at least 1");
		}
		Ok(Self {
			state: Mutex::new(State {
				queue: VecDeque::with_capacity(capacity),
				closed: false,
				dropped: 0,
			}),
			ready: Condvar::new(),
			capacity,
			policy,
		})
	}

	/// Hands `item` to the consumer. Silently discards it if the channel is
	/// closed. Never waits for the consumer.
	pub fn push(&self, item: T) {
		let mut state = self.state.lock();
		if state.closed {
			return;
		}
		match self.policy {
			OverflowPolicy::DropOldest => {
				while state.queue.len() >= self.capacity {
					state.queue.pop_front();
					state.dropped += 1;
				}
			}
			OverflowPolicy::DropNewest => {
				if state.queue.len() >= self.capacity {
					state.dropped += 1;
					return;
				}
			}
		}
		state.queue.push_back(item);
		drop(state);
		self.ready.notify_one();
	}

	/// Waits up to `timeout` for a frame.
	///
	/// Returns `None` if the timeout elapsed, or if the channel is closed and
	/// fully drained; callers tell the two apart by checking their own
	/// shutdown state. A zero timeout polls without waiting.
	pub fn pop(&self, timeout: Duration) -> Option<T> {
		let deadline = Instant::now().checked_add(timeout);
		let mut state = self.state.lock();
		loop {
			if let Some(item) = state.queue.pop_front() {
				return Some(item);
			}
			if state.closed || timeout.is_zero() {
				return None;
			}
			match deadline {
				Some(deadline) => {
					if self.ready.wait_until(&mut state, deadline).timed_out() {
						return state.queue.pop_front();
					}
				}
				None => self.ready.wait(&mut state),
			}
		}
	}

	#[inline]
	pub fn try_pop(&self) -> Option<T> {
		self.pop(Duration::ZERO)
	}

	/// Stops accepting frames and wakes every waiter. Buffered frames stay
	/// available to `pop`. Calling this more than once is harmless.
	pub fn close(&self) {
		let mut state = self.state.lock();
		state.closed = true;
		drop(state);
		self.ready.notify_all();
	}

	pub fn is_closed(&self) -> bool {
		self.state.lock().closed
	}

	/// Current occupancy. Only meaningful as a diagnostic.
	pub fn size(&self) -> usize {
		self.state.lock().queue.len()
	}

	#[inline]
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	#[inline]
	pub fn policy(&self) -> OverflowPolicy {
		self.policy
	}

	/// Frames discarded by the overflow policy since creation.
	pub fn dropped(&self) -> u64 {
		self.state.lock().dropped
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::{sync::Arc, thread};

	#[test]
	fn zero_capacity_is_rejected() {
		assert!(FrameChannel::<u32>::new(0).is_err());
	}

	#[test]
	fn size_never_exceeds_capacity() {
		for capacity in 1..=8 {
			let channel = FrameChannel::new(capacity).unwrap();
			for i in 0..32 {
				channel.push(i);
				assert!(channel.size() <= capacity);
			}
			assert_eq!(channel.size(), capacity);
			assert_eq!(channel.dropped(), (32 - capacity) as u64);
		}
	}

	#[test]
	fn interleaved_push_pop_is_fifo() {
		let channel = FrameChannel::new(3).unwrap();
		let mut received = Vec::new();
		let mut next = 0;
		for burst in [1, 3, 2, 3, 1] {
			for _ in 0..burst {
				channel.push(next);
				next += 1;
			}
			while let Some(item) = channel.try_pop() {
				received.push(item);
			}
		}
		assert_eq!(received, (0..next).collect::<Vec<_>>());
		assert_eq!(channel.dropped(), 0);
	}

	#[test]
	fn overflow_drops_oldest_first() {
		let channel = FrameChannel::new(2).unwrap();
		channel.push('a');
		channel.push('b');
		channel.push('c');
		assert_eq!(channel.pop(Duration::ZERO), Some('b'));
		assert_eq!(channel.pop(Duration::ZERO), Some('c'));
		assert_eq!(channel.pop(Duration::ZERO), None);
	}

	#[test]
	fn drop_newest_keeps_buffered_frames() {
		let channel = FrameChannel::with_policy(2, OverflowPolicy::DropNewest).unwrap();
		channel.push('a');
		channel.push('b');
		channel.push('c');
		assert_eq!(channel.dropped(), 1);
		assert_eq!(channel.try_pop(), Some('a'));
		assert_eq!(channel.try_pop(), Some('b'));
		assert_eq!(channel.try_pop(), None);
	}

	#[test]
	fn pop_times_out_on_empty_open_channel() {
		let channel = FrameChannel::<u32>::new(1).unwrap();
		let start = Instant::now();
		assert_eq!(channel.pop(Duration::from_millis(50)), None);
		assert!(start.elapsed() >= Duration::from_millis(50));
		assert!(!channel.is_closed());
	}

	#[test]
	fn closed_empty_channel_returns_immediately() {
		let channel = FrameChannel::<u32>::new(4).unwrap();
		channel.close();
		let start = Instant::now();
		assert_eq!(channel.pop(Duration::from_secs(5)), None);
		assert!(start.elapsed() < Duration::from_secs(1));
	}

	#[test]
	fn close_drains_buffered_frames_in_order() {
		let channel = FrameChannel::new(4).unwrap();
		channel.push(1);
		channel.push(2);
		channel.push(3);
		channel.close();
		assert_eq!(channel.pop(Duration::from_secs(1)), Some(1));
		assert_eq!(channel.pop(Duration::from_secs(1)), Some(2));
		assert_eq!(channel.pop(Duration::from_secs(1)), Some(3));
		assert_eq!(channel.pop(Duration::from_secs(1)), None);
	}

	#[test]
	fn push_after_close_is_ignored() {
		let channel = FrameChannel::new(4).unwrap();
		channel.push(1);
		channel.close();
		channel.close();
		channel.push(2);
		assert_eq!(channel.size(), 1);
		assert_eq!(channel.dropped(), 0);
	}

	#[test]
	fn close_wakes_a_blocked_consumer() {
		let channel = Arc::new(FrameChannel::<u32>::new(1).unwrap());
		let consumer = {
			let channel = channel.clone();
			thread::spawn(move || {
				let start = Instant::now();
				let item = channel.pop(Duration::from_secs(10));
				(item, start.elapsed())
			})
		};
		thread::sleep(Duration::from_millis(50));
		channel.close();
		let (item, waited) = consumer.join().unwrap();
		assert_eq!(item, None);
		assert!(waited < Duration::from_secs(5));
	}

	#[test]
	fn producer_and_consumer_threads() {
		const TOTAL: u64 = 10_000;
		let channel = Arc::new(FrameChannel::new(5).unwrap());
		let first_push = Arc::new(Mutex::new(None::<Instant>));

		let consumer = {
			let channel = channel.clone();
			let first_push = first_push.clone();
			thread::spawn(move || {
				let mut received = Vec::new();
				let mut first_latency = None;
				loop {
					match channel.pop(Duration::from_millis(50)) {
						Some(item) => {
							if first_latency.is_none() {
								let pushed_at = (*first_push.lock()).expect("push recorded");
								first_latency = Some(pushed_at.elapsed());
							}
							received.push(item);
						}
						None if channel.is_closed() => break,
						None => {}
					}
				}
				(received, first_latency)
			})
		};

		for i in 0..TOTAL {
			if i == 0 {
				*first_push.lock() = Some(Instant::now());
			}
			channel.push(i);
		}
		channel.close();

		let (received, first_latency) = consumer.join().unwrap();
		assert!(!received.is_empty());
		assert!(received.len() as u64 <= TOTAL);
		assert!(received.windows(2).all(|w| w[0] < w[1]));
		assert!(first_latency.unwrap() <= Duration::from_millis(100));
		assert_eq!(received.len() as u64 + channel.dropped(), TOTAL);
	}
}
