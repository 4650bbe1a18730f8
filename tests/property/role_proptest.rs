//! Property tests for the role hierarchy

use proptest::prelude::*;
use rolegate::gateway::decide;
use rolegate::shared::Role;

fn known_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::User), Just(Role::Editor), Just(Role::Admin)]
}

fn unknown_role() -> impl Strategy<Value = Role> {
    "[A-Za-z_]{1,16}"
        .prop_filter("must not name a ranked role", |name| {
            !matches!(name.as_str(), "user" | "editor" | "admin")
        })
        .prop_map(|name| Role::from(name))
}

proptest! {
    #[test]
    fn test_known_roles_dominate_themselves(role in known_role()) {
        prop_assert!(role.dominates(&role));
        prop_assert!(decide(&role, &role).allowed);
    }

    #[test]
    fn test_admin_dominates_every_known_role(required in known_role()) {
        prop_assert!(Role::Admin.dominates(&required));
    }

    #[test]
    fn test_decision_follows_rank(user in known_role(), required in known_role()) {
        let decision = decide(&user, &required);
        prop_assert_eq!(decision.allowed, user.rank() >= required.rank());
        if decision.allowed {
            prop_assert!(decision.message.is_none());
        } else {
            prop_assert_eq!(
                decision.message,
                Some(format!("Permission denied: {} role required", required))
            );
        }
    }

    #[test]
    fn test_unknown_roles_never_pass(unknown in unknown_role(), known in known_role()) {
        prop_assert!(unknown.rank().is_none());
        prop_assert!(!decide(&unknown, &known).allowed);
        prop_assert!(!decide(&known, &unknown).allowed);
        prop_assert!(!decide(&unknown, &unknown).allowed);
    }

    #[test]
    fn test_role_name_survives_parsing(name in "[A-Za-z_]{1,16}") {
        prop_assert_eq!(Role::from(name.as_str()).to_string(), name);
    }

    #[test]
    fn test_highest_has_maximal_rank(roles in prop::collection::vec(known_role(), 1..8)) {
        let highest = Role::highest(roles.clone()).unwrap();
        for role in &roles {
            prop_assert!(highest.dominates(role));
        }
        prop_assert!(roles.contains(&highest));
    }
}
