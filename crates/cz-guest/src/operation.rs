//! ---
//! cz_section: "04-guest-runtime"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Driver fragments for operations and auxiliary actions."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
//! Each operation is driven by a module under `cozmonaut/operation/` that
//! exports `start(args)` and `stop(op)`. The start fragment binds the result
//! to the top-level `op`; every later fragment assumes `op` exists.

use cz_common::{GuestAction, OperationKind};

pub fn driver_module(op: OperationKind) -> &'static str {
    match op {
        OperationKind::FriendsList => "cozmonaut/operation/friends_list",
        OperationKind::FriendsRemove => "cozmonaut/operation/friends_remove",
        OperationKind::Interact => "cozmonaut/operation/interact",
    }
}

pub fn start_fragment(op: OperationKind) -> String {
    format!(
        "import \"{}\" as driver;\nlet op = driver::start(args);\n",
        driver_module(op)
    )
}

pub fn stop_fragment(op: OperationKind) -> String {
    format!(
        "import \"{}\" as driver;\nop = driver::stop(op);\n",
        driver_module(op)
    )
}

/// Driver function invoked for an auxiliary action. All of them live in the
/// interact driver.
pub fn action_function(action: GuestAction) -> &'static str {
    match action {
        GuestAction::AutoEnable => "auto_enable",
        GuestAction::AutoDisable => "auto_disable",
        GuestAction::TestLowBattery => "test_low_battery",
        GuestAction::ManualAdvance => "manual_advance",
        GuestAction::ManualReturn => "manual_return",
        GuestAction::DiversionFaces => "manual_req_diversion_faces",
        GuestAction::DiversionConverse => "manual_req_diversion_converse",
        GuestAction::DiversionWander => "manual_req_diversion_wander",
    }
}

pub fn action_fragment(action: GuestAction) -> String {
    format!(
        "import \"{}\" as driver;\nop = driver::{}(op);\n",
        driver_module(OperationKind::Interact),
        action_function(action)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn start_binds_op_and_stop_reassigns_it() {
        let start = start_fragment(OperationKind::FriendsRemove);
        assert!(start.contains("\"cozmonaut/operation/friends_remove\""));
        assert!(start.contains("let op = driver::start(args);"));
        assert!(stop_fragment(OperationKind::Interact).contains("op = driver::stop(op);"));
    }

    #[test]
    fn every_action_targets_the_interact_driver() {
        for action in GuestAction::iter() {
            let fragment = action_fragment(action);
            assert!(fragment.contains("cozmonaut/operation/interact"));
            assert!(fragment.contains(action_function(action)));
        }
    }
}
