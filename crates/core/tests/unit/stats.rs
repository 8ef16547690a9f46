//! Nested stats tree tests (§6).

use dram_core::stats::StatBlock;

#[test]
fn builder_methods_record_values_and_children() {
    let block = StatBlock::new("controller", "default", Some(0))
        .with("requests_admitted", 10.0)
        .with("reads_completed", 7.0)
        .with_child(StatBlock::new("scheduler", "default", None).with("selections", 7.0));

    assert_eq!(block.ifce, "controller");
    assert_eq!(block.implementation, "default");
    assert_eq!(block.id, Some(0));
    assert_eq!(block.values.get("requests_admitted"), Some(&10.0));
    assert_eq!(block.values.get("reads_completed"), Some(&7.0));
    assert_eq!(block.children.len(), 1);
    assert_eq!(block.children[0].ifce, "scheduler");
}

#[test]
fn in_place_setters_mutate_an_existing_block() {
    let mut block = StatBlock::new("device", "DDR4", None);
    block.set("commands_issued", 3.0);
    block.set("commands_issued", 4.0);
    block.push_child(StatBlock::new("row_policy", "open", None));

    assert_eq!(block.values.get("commands_issued"), Some(&4.0));
    assert_eq!(block.children.len(), 1);
}

#[test]
fn values_render_in_sorted_key_order() {
    let block = StatBlock::new("plugin", "graphene", None).with("zeta", 1.0).with("alpha", 2.0);
    let rendered = block.render();
    let alpha_pos = rendered.find("alpha").unwrap();
    let zeta_pos = rendered.find("zeta").unwrap();
    assert!(alpha_pos < zeta_pos);
}

#[test]
fn render_includes_ifce_impl_and_instance_id() {
    let block = StatBlock::new("controller", "default", Some(2));
    let rendered = block.render();
    assert!(rendered.contains("controller"));
    assert!(rendered.contains("default"));
    assert!(rendered.contains("[2]"));
}

#[test]
fn render_recurses_into_nested_children_with_increasing_indent() {
    let block = StatBlock::new("system", "memory-system", None).with_child(
        StatBlock::new("controller", "default", Some(0))
            .with_child(StatBlock::new("scheduler", "default", None).with("selections", 5.0)),
    );
    let rendered = block.render();
    let lines: Vec<&str> = rendered.lines().collect();

    let system_line = lines.iter().position(|l| l.contains("system")).unwrap();
    let controller_line = lines.iter().position(|l| l.contains("controller")).unwrap();
    let scheduler_line = lines.iter().position(|l| l.contains("scheduler")).unwrap();
    assert!(system_line < controller_line);
    assert!(controller_line < scheduler_line);

    let controller_indent = lines[controller_line].len() - lines[controller_line].trim_start().len();
    let scheduler_indent = lines[scheduler_line].len() - lines[scheduler_line].trim_start().len();
    assert!(scheduler_indent > controller_indent);
}

#[test]
fn a_block_with_no_values_still_renders_its_header() {
    let block = StatBlock::new("row_policy", "open", None);
    let rendered = block.render();
    assert!(rendered.contains("row_policy"));
    assert!(rendered.contains("open"));
}
