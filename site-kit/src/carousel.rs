/// Slide position for the testimonial and gallery carousels. Navigation
/// wraps around at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carousel {
    len: usize,
    index: usize,
}

impl Carousel {
    pub fn new(len: usize) -> Self {
        Self { len, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn next_slide(&mut self) -> usize {
        if !self.is_empty() {
            self.index = (self.index + 1) % self.len;
        }
        self.index
    }

    pub fn prev_slide(&mut self) -> usize {
        if !self.is_empty() {
            self.index = (self.index + self.len - 1) % self.len;
        }
        self.index
    }

    /// Jumps to a dot indicator; out-of-range targets land on the last slide.
    pub fn go_to(&mut self, target: usize) -> usize {
        self.index = target.min(self.len.saturating_sub(1));
        self.index
    }
}
