/// Policy - "at most `allowed_number` requests per `window_minutes` minutes".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub allowed_number: u64,
    pub window_minutes: u32,
}

impl Policy {
    pub fn new(allowed_number: u64, window_minutes: u32) -> Self {
        Self {
            allowed_number,
            window_minutes,
        }
    }
}
