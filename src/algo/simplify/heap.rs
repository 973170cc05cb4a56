//! Indexed binary min-heap of collapse costs.

const ABSENT: u32 = u32::MAX;

/// A binary min-heap over a fixed index space `0..capacity`.
///
/// Every index appears at most once. Costs can be changed or removed in
/// `O(log n)` through the index, which the driver uses to keep edge costs
/// current after each collapse. Ties are broken by the lower index. `NaN`
/// costs are stored as `+inf`.
#[derive(Debug, Clone)]
pub struct CostHeap {
    heap: Vec<u32>,
    pos: Vec<u32>,
    keys: Vec<f64>,
}

impl CostHeap {
    /// An empty heap for indices below `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            pos: vec![ABSENT; capacity],
            keys: vec![f64::INFINITY; capacity],
        }
    }

    /// Number of queued indices.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// True if `index` is queued.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.pos[index] != ABSENT
    }

    /// The cost of `index`, if queued.
    pub fn key(&self, index: usize) -> Option<f64> {
        self.contains(index).then(|| self.keys[index])
    }

    /// Queue `index` with `cost`, or change its cost if already queued.
    pub fn add(&mut self, index: usize, cost: f64) {
        if self.contains(index) {
            self.update(index, cost);
            return;
        }
        self.keys[index] = sanitize(cost);
        self.pos[index] = self.heap.len() as u32;
        self.heap.push(index as u32);
        self.sift_up(self.heap.len() - 1);
    }

    /// Change the cost of a queued `index`. Does nothing if it is absent.
    pub fn update(&mut self, index: usize, cost: f64) {
        if !self.contains(index) {
            return;
        }
        self.keys[index] = sanitize(cost);
        let at = self.pos[index] as usize;
        self.sift_up(at);
        self.sift_down(self.pos[index] as usize);
    }

    /// Dequeue `index`. Does nothing if it is absent.
    pub fn remove(&mut self, index: usize) {
        if !self.contains(index) {
            return;
        }
        let at = self.pos[index] as usize;
        let last = self.heap.len() - 1;
        self.swap(at, last);
        self.heap.pop();
        self.pos[index] = ABSENT;
        if at < self.heap.len() {
            self.sift_up(at);
            let moved = self.heap[at] as usize;
            self.sift_down(self.pos[moved] as usize);
        }
    }

    /// The cheapest entry without removing it.
    pub fn peek(&self) -> Option<(usize, f64)> {
        self.heap.first().map(|&i| (i as usize, self.keys[i as usize]))
    }

    /// Remove and return the cheapest entry.
    pub fn pop(&mut self) -> Option<(usize, f64)> {
        let top = self.peek()?;
        self.remove(top.0);
        Some(top)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        for &i in &self.heap {
            self.pos[i as usize] = ABSENT;
        }
        self.heap.clear();
    }

    #[inline]
    fn less(&self, a: usize, b: usize) -> bool {
        let (ia, ib) = (self.heap[a] as usize, self.heap[b] as usize);
        match self.keys[ia].total_cmp(&self.keys[ib]) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => ia < ib,
        }
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.pos[self.heap[a] as usize] = a as u32;
        self.pos[self.heap[b] as usize] = b as u32;
    }

    fn sift_up(&mut self, mut at: usize) {
        while at > 0 {
            let parent = (at - 1) / 2;
            if !self.less(at, parent) {
                break;
            }
            self.swap(at, parent);
            at = parent;
        }
    }

    fn sift_down(&mut self, mut at: usize) {
        let n = self.heap.len();
        loop {
            let left = 2 * at + 1;
            if left >= n {
                break;
            }
            let right = left + 1;
            let child = if right < n && self.less(right, left) { right } else { left };
            if !self.less(child, at) {
                break;
            }
            self.swap(at, child);
            at = child;
        }
    }
}

#[inline]
fn sanitize(cost: f64) -> f64 {
    if cost.is_nan() {
        f64::INFINITY
    } else {
        cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Small deterministic generator so the test needs no extra crates.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            self.0 >> 33
        }

        fn cost(&mut self) -> f64 {
            (self.next() % 1000) as f64 * 0.25
        }
    }

    fn scan_min(live: &[Option<f64>]) -> Option<(usize, f64)> {
        live.iter()
            .enumerate()
            .filter_map(|(i, k)| k.map(|k| (i, k)))
            .fold(None, |best, (i, k)| match best {
                Some((_, bk)) if bk <= k => best,
                _ => Some((i, k)),
            })
    }

    #[test]
    fn test_pop_order() {
        let mut heap = CostHeap::new(5);
        heap.add(0, 3.0);
        heap.add(1, 1.0);
        heap.add(2, 2.0);
        heap.add(3, 1.0);
        heap.add(4, f64::NAN);

        assert_eq!(heap.len(), 5);
        assert_eq!(heap.pop(), Some((1, 1.0)));
        assert_eq!(heap.pop(), Some((3, 1.0)));
        assert_eq!(heap.pop(), Some((2, 2.0)));
        assert_eq!(heap.pop(), Some((0, 3.0)));
        assert_eq!(heap.pop(), Some((4, f64::INFINITY)));
        assert!(heap.pop().is_none());
    }

    #[test]
    fn test_update_and_remove() {
        let mut heap = CostHeap::new(4);
        for i in 0..4 {
            heap.add(i, i as f64);
        }
        heap.update(3, -1.0);
        assert_eq!(heap.peek(), Some((3, -1.0)));

        heap.remove(3);
        assert!(!heap.contains(3));
        assert_eq!(heap.key(3), None);
        heap.remove(3);

        // Re-adding an existing index updates it.
        heap.add(0, 10.0);
        assert_eq!(heap.len(), 3);
        assert_eq!(heap.pop(), Some((1, 1.0)));

        heap.clear();
        assert!(heap.is_empty());
        assert!(!heap.contains(2));
    }

    #[test]
    fn test_matches_linear_scan() {
        const N: usize = 64;
        let mut rng = Lcg(7);
        let mut heap = CostHeap::new(N);
        let mut live = vec![None; N];

        for i in 0..N {
            let c = rng.cost();
            heap.add(i, c);
            live[i] = Some(c);
        }

        while !heap.is_empty() {
            // Perturb a few live entries between pops.
            for _ in 0..3 {
                let i = (rng.next() as usize) % N;
                match rng.next() % 3 {
                    0 if live[i].is_some() => {
                        heap.remove(i);
                        live[i] = None;
                    }
                    1 if live[i].is_some() => {
                        let c = rng.cost();
                        heap.update(i, c);
                        live[i] = Some(c);
                    }
                    _ => {}
                }
            }

            let expected = scan_min(&live);
            let popped = heap.pop();
            assert_eq!(popped, expected);
            if let Some((i, _)) = popped {
                live[i] = None;
            }
        }
        assert!(live.iter().all(Option::is_none));
    }
}
