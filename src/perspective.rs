use serde::{Deserialize, Serialize};

use crate::debt::Debt;
use crate::types::{Orientation, PartyRole, PaymentStatus};

/// a debt as seen by one specific party
///
/// the orientation is stored once from the creator's point of view; the
/// counterparty sees it inverted. a pure projection, never a second copy of
/// the debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveView {
    /// orientation from the viewing party's perspective
    pub orientation: Orientation,
    /// the viewing party's role in the obligation
    pub actor_role: PartyRole,
    pub actor_is_owner: bool,
}

/// resolve a debt's orientation and the actor's role for the given side
pub fn resolve(debt: &Debt, actor_is_owner: bool) -> EffectiveView {
    let orientation = if actor_is_owner {
        debt.orientation
    } else {
        debt.orientation.invert()
    };

    // in the resolved orientation, OwnerOwes means "I owe": the viewer is the
    // debtor; OwnerIsOwed means the viewer is the creditor
    let actor_role = match orientation {
        Orientation::OwnerOwes => PartyRole::Debtor,
        Orientation::OwnerIsOwed => PartyRole::Creditor,
    };

    EffectiveView {
        orientation,
        actor_role,
        actor_is_owner,
    }
}

/// initial status of a payment recorded by a party with the given role
///
/// a debtor's payment waits for the creditor's confirmation; a payment the
/// creditor records on the debtor's behalf needs no verification, the party
/// confirming receipt is the one recording it
pub fn initial_payment_status(role: PartyRole) -> PaymentStatus {
    match role {
        PartyRole::Debtor => PaymentStatus::Pending,
        PartyRole::Creditor => PaymentStatus::Completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Frequency;
    use crate::debt::{Debt, DebtRequest};
    use crate::decimal::Money;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn debt(orientation: Orientation) -> Debt {
        let request = DebtRequest::new(
            Uuid::new_v4(),
            orientation,
            Money::from_major(100),
            Frequency::Monthly,
        )
        .with_payment_count(2);
        Debt::create(
            Uuid::new_v4(),
            request,
            "Php",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_owner_view_keeps_orientation() {
        let debt = debt(Orientation::OwnerOwes);
        let view = resolve(&debt, true);
        assert_eq!(view.orientation, Orientation::OwnerOwes);
        assert_eq!(view.actor_role, PartyRole::Debtor);
    }

    #[test]
    fn test_contact_view_inverts_orientation() {
        let debt = debt(Orientation::OwnerOwes);
        let view = resolve(&debt, false);
        assert_eq!(view.orientation, Orientation::OwnerIsOwed);
        assert_eq!(view.actor_role, PartyRole::Creditor);
    }

    #[test]
    fn test_roles_swap_with_orientation() {
        let debt = debt(Orientation::OwnerIsOwed);
        assert_eq!(resolve(&debt, true).actor_role, PartyRole::Creditor);
        assert_eq!(resolve(&debt, false).actor_role, PartyRole::Debtor);
    }

    #[test]
    fn test_initial_status_by_role() {
        assert_eq!(initial_payment_status(PartyRole::Debtor), PaymentStatus::Pending);
        assert_eq!(initial_payment_status(PartyRole::Creditor), PaymentStatus::Completed);
    }
}
