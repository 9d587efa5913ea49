/// Reusable membership masks, one slot per event, so repeated containment
/// passes over the same event array do not reallocate.
pub struct MaskPool {
    masks: Vec<Vec<bool>>,
    max_capacity: usize,
}

impl MaskPool {
    pub fn with_capacity(max_capacity: usize) -> Self {
        Self {
            masks: Vec::with_capacity(max_capacity),
            max_capacity,
        }
    }

    /// Hands out a cleared mask of `length` slots.
    pub fn checkout(&mut self, length: usize) -> Vec<bool> {
        match self.masks.pop() {
            Some(mut mask) => {
                mask.clear();
                mask.resize(length, false);
                mask
            }
            None => vec![false; length],
        }
    }

    pub fn release(&mut self, mask: Vec<bool>) {
        if self.masks.len() < self.max_capacity {
            self.masks.push(mask);
        }
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}

impl Default for MaskPool {
    fn default() -> Self {
        Self::with_capacity(1)
    }
}
