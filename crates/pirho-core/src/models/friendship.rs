//! Friendship relation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unordered pair of users stored as `(min, max)` so that each friendship
/// has exactly one canonical row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FriendPair {
    low: Uuid,
    high: Uuid,
}

impl FriendPair {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> Uuid {
        self.low
    }

    pub fn high(&self) -> Uuid {
        self.high
    }

    /// The member of the pair that is not `user_id`, if `user_id` is in it.
    pub fn other(&self, user_id: Uuid) -> Option<Uuid> {
        if self.low == user_id {
            Some(self.high)
        } else if self.high == user_id {
            Some(self.low)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(FriendPair::new(a, b), FriendPair::new(b, a));
        assert!(FriendPair::new(a, b).low() <= FriendPair::new(a, b).high());
    }

    #[test]
    fn other_member() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let pair = FriendPair::new(a, b);
        assert_eq!(pair.other(a), Some(b));
        assert_eq!(pair.other(b), Some(a));
        assert_eq!(pair.other(Uuid::new_v4()), None);
    }
}
