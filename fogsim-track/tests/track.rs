// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use fogsim_track::entity::Entity;
use fogsim_track::test_helpers::check_and_clear;
use fogsim_track::{create_tag, destroy_tag, enter, exit, info, test_init, warn};

#[test]
fn entity_hierarchy_names() {
    let (test_tracker, tracker) = test_init!(10);
    let top = fogsim_track::entity::toplevel(&tracker, "top");
    let cloud = std::sync::Arc::new(Entity::new(&top, "cloud"));
    let uplink = Entity::new(&cloud, "uplink");

    assert_eq!(top.full_name(), "top");
    assert_eq!(cloud.full_name(), "top::cloud");
    assert_eq!(uplink.full_name(), "top::cloud::uplink");
    assert_eq!(format!("{uplink}"), "top::cloud::uplink");

    check_and_clear(
        &test_tracker,
        &[
            "0: created 10, top",
            "10: created 11, top::cloud",
            "11: created 12, top::cloud::uplink",
        ],
    );
}

#[test]
fn log_macros_emit_messages() {
    let (test_tracker, tracker) = test_init!(20);
    let top = fogsim_track::entity::toplevel(&tracker, "top");
    fogsim_track::test_helpers::clear(&test_tracker);

    info!(top; "routing {} tuples", 3);
    warn!(top; "link busy");

    check_and_clear(
        &test_tracker,
        &["20:INFO: routing 3 tuples", "20:WARN: link busy"],
    );
}

#[test]
fn enter_exit_and_tag_lifetime() {
    let (test_tracker, tracker) = test_init!(30);
    let top = fogsim_track::entity::toplevel(&tracker, "top");
    fogsim_track::test_helpers::clear(&test_tracker);

    let tag = create_tag!(top);
    enter!(top; tag);
    exit!(top; tag);
    destroy_tag!(top; tag);

    check_and_clear(
        &test_tracker,
        &["30: 31 entered", "30: 31 exited", "30: destroyed 31"],
    );
}

#[test]
fn destroy_on_drop() {
    let (test_tracker, tracker) = test_init!(40);
    let top = fogsim_track::entity::toplevel(&tracker, "top");
    {
        let _child = Entity::new(&top, "gateway");
    }

    check_and_clear(
        &test_tracker,
        &[
            "0: created 40, top",
            "40: created 41, top::gateway",
            "41: destroyed 40",
        ],
    );
}
