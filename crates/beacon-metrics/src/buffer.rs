//! 용량 제한 버퍼.
//!
//! 링 버퍼가 아니라 일괄 트리밍: 용량을 넘는 순간 최근 `capacity / 2`건만 남긴다.

/// 추가 전용 용량 제한 버퍼
#[derive(Debug)]
pub struct BoundedBuffer<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> BoundedBuffer<T> {
    /// 새 버퍼 생성 (capacity는 2 이상으로 보정)
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity: capacity.max(2),
        }
    }

    /// 항목 추가. 용량 초과로 잘려 나간 항목 수 반환
    pub fn push(&mut self, item: T) -> usize {
        self.items.push(item);
        if self.items.len() <= self.capacity {
            return 0;
        }
        let keep = self.capacity / 2;
        let dropped = self.items.len() - keep;
        self.items.drain(..dropped);
        dropped
    }

    /// 추가 순서(오래된 것 먼저) 순회
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_within_capacity() {
        let mut buf = BoundedBuffer::new(10);
        for i in 0..1000 {
            buf.push(i);
            assert!(buf.len() <= 10);
        }
    }

    #[test]
    fn overflow_truncates_to_half_oldest_first() {
        let mut buf = BoundedBuffer::new(10);
        for i in 0..10 {
            assert_eq!(buf.push(i), 0);
        }
        assert_eq!(buf.len(), 10);

        let dropped = buf.push(10);
        assert_eq!(dropped, 6);
        assert_eq!(buf.len(), 5);
        let kept: Vec<_> = buf.iter().copied().collect();
        assert_eq!(kept, vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn odd_capacity_keeps_floor_half() {
        let mut buf = BoundedBuffer::new(7);
        for i in 0..8 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![5, 6, 7]);
    }

    #[test]
    fn tiny_capacity_is_clamped() {
        let buf: BoundedBuffer<u8> = BoundedBuffer::new(0);
        assert_eq!(buf.capacity(), 2);
    }
}
