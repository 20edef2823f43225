use crate::bookings::BookingStatus;

/// Service for managing booking status transitions
pub struct BookingStatusMachine;

impl BookingStatusMachine {
    /// Check if a status transition is valid
    ///
    /// # Valid Transitions
    /// - Pending → Confirmed, Cancelled
    /// - Confirmed → Completed, Cancelled
    /// - Cancelled and Completed are terminal
    ///
    /// Repeating the current status is rejected so a second cancel is reported, not absorbed.
    pub fn is_valid_transition(from: BookingStatus, to: BookingStatus) -> bool {
        matches!(
            (from, to),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    /// Attempt to transition from one status to another
    ///
    /// # Returns
    /// `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(from: BookingStatus, to: BookingStatus) -> Result<BookingStatus, String> {
        if Self::is_valid_transition(from, to) {
            return Ok(to);
        }
        if from == to {
            return Err(format!("Booking is already {}", from));
        }
        Err(format!("Invalid status transition from {} to {}", from, to))
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn booking_status_strategy() -> impl Strategy<Value = BookingStatus> {
        prop_oneof![
            Just(BookingStatus::Pending),
            Just(BookingStatus::Confirmed),
            Just(BookingStatus::Cancelled),
            Just(BookingStatus::Completed),
        ]
    }

    proptest! {
        #[test]
        fn prop_terminal_states_have_no_exits(
            terminal in prop_oneof![Just(BookingStatus::Cancelled), Just(BookingStatus::Completed)],
            to in booking_status_strategy()
        ) {
            prop_assert!(!BookingStatusMachine::is_valid_transition(terminal, to));
        }

        #[test]
        fn prop_nothing_returns_to_pending(from in booking_status_strategy()) {
            prop_assert!(!BookingStatusMachine::is_valid_transition(from, BookingStatus::Pending));
        }

        #[test]
        fn prop_transition_agrees_with_validity(
            from in booking_status_strategy(),
            to in booking_status_strategy()
        ) {
            let valid = BookingStatusMachine::is_valid_transition(from, to);
            prop_assert_eq!(BookingStatusMachine::transition(from, to).is_ok(), valid);
        }
    }
}
