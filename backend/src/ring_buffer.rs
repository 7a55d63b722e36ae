use std::collections::VecDeque;

pub struct RingBuffer<T> {
    max: usize,
    buf: VecDeque<T>,
}

impl<T> RingBuffer<T> {
    pub fn new(max: usize) -> Self {
        Self {
            max: max.max(1),
            buf: VecDeque::with_capacity(max.max(1)),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.buf.len() == self.max {
            self.buf.pop_front();
        }
        self.buf.push_back(item);
    }

}

impl RingBuffer<u64> {
    /// Integer mean of the retained items, `None` while empty.
    pub fn average(&self) -> Option<u64> {
        if self.buf.is_empty() {
            return None;
        }
        let sum: u128 = self.buf.iter().map(|&v| v as u128).sum();
        Some((sum / self.buf.len() as u128) as u64)
    }
}
