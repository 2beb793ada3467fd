//! 置換表のテスト

use super::*;
use crate::types::Move;

const POINTS: usize = 25;

fn table(slots: usize) -> TranspositionTable {
    TranspositionTable::new(slots, POINTS, slots * 3)
}

/// a -> b -> {c, d} -> e の DAG を作る
fn diamond(table: &TranspositionTable) -> [NodeId; 5] {
    let ids: Vec<NodeId> = (0..5u64).map(|fp| table.find_or_allocate(fp).unwrap()).collect();
    let [a, b, c, d, e] = [ids[0], ids[1], ids[2], ids[3], ids[4]];
    assert!(table.add_child(a, b));
    assert!(table.add_child(b, c));
    assert!(table.add_child(b, d));
    assert!(table.add_child(c, e));
    assert!(table.add_child(d, e));
    [a, b, c, d, e]
}

#[test]
fn test_find_or_allocate_identity() {
    let table = table(17);
    let m = table.find_or_allocate(u64::MAX).unwrap();
    assert_eq!(table.find_or_allocate(u64::MAX), Some(m));
    let p = table.find_or_allocate(1).unwrap();
    assert_ne!(m, p);
}

#[test]
fn test_colliding_slots_scan_forward() {
    let table = table(17);
    let a = table.find_or_allocate(1).unwrap();
    let b = table.find_or_allocate(1 + 17).unwrap();
    assert_ne!(a, b);
    assert_eq!(table.find_or_allocate(1), Some(a));
    assert_eq!(table.find_or_allocate(18), Some(b));
    assert_eq!(table.node(b).fingerprint(), 18);
}

#[test]
fn test_find_if_present_never_allocates() {
    let table = table(17);
    assert_eq!(table.find_if_present(1), None);
    table.find_or_allocate(0).unwrap();
    let n = table.find_or_allocate(1).unwrap();
    table.find_or_allocate(2).unwrap();
    assert_eq!(table.find_if_present(1), Some(n));
    assert_eq!(table.live_nodes(), 3);
}

#[test]
fn test_allocation_fails_when_no_nodes_left() {
    let table = table(17);
    for fp in 0..17u64 {
        assert!(table.find_or_allocate(fp).is_some(), "fingerprint {fp}");
    }
    assert_eq!(table.find_or_allocate(17), None);
    // 既存のノードは引き続き引ける
    assert!(table.find_or_allocate(16).is_some());
}

#[test]
fn test_add_child_prepends() {
    let table = table(17);
    let parent = table.find_or_allocate(0).unwrap();
    let child1 = table.find_or_allocate(1).unwrap();
    let child2 = table.find_or_allocate(2).unwrap();
    table.add_child(parent, child1);
    table.add_child(parent, child2);
    let children: Vec<NodeId> = table.children(parent).collect();
    assert_eq!(children, vec![child2, child1]);
}

#[test]
fn test_link_child_once_per_move() {
    let table = table(17);
    let parent = table.find_or_allocate(0).unwrap();
    let child = table.find_or_allocate(1).unwrap();
    assert!(table.link_child(parent, Move::point(3), child));
    assert!(table.link_child(parent, Move::point(3), child));
    assert!(table.link_child(parent, Move::point(4), child));
    // 同じ子でも手が違えば別のリンク
    assert_eq!(table.children(parent).count(), 2);
    assert!(table.node(parent).has_child(Move::point(3)));
}

#[test]
fn test_link_exhaustion_is_reported() {
    let table = TranspositionTable::new(17, POINTS, 1);
    let parent = table.find_or_allocate(0).unwrap();
    let c1 = table.find_or_allocate(1).unwrap();
    let c2 = table.find_or_allocate(2).unwrap();
    assert!(table.link_child(parent, Move::point(0), c1));
    assert!(!table.link_child(parent, Move::point(1), c2));
    assert!(!table.node(parent).has_child(Move::point(1)));
}

#[test]
fn test_mark_nodes_reachable_from() {
    let table = table(17);
    let [a, b, c, d, e] = diamond(&table);
    table.mark_nodes_reachable_from(b);
    assert!(!table.node(a).is_marked());
    for id in [b, c, d, e] {
        assert!(table.node(id).is_marked());
    }
}

#[test]
fn test_dag_size() {
    let table = table(17);
    let [a, b, c, d, e] = diamond(&table);
    assert_eq!(table.dag_size(a), 5);
    assert_eq!(table.dag_size(b), 4);
    assert_eq!(table.dag_size(c), 2);
    assert_eq!(table.dag_size(d), 2);
    assert_eq!(table.dag_size(e), 1);
    // dag_size は印を残さない
    assert!(!table.node(a).is_marked());
}

#[test]
fn test_mark_is_cycle_safe() {
    let table = table(17);
    let a = table.find_or_allocate(0).unwrap();
    let b = table.find_or_allocate(1).unwrap();
    table.add_child(a, b);
    table.add_child(b, a);
    table.mark_nodes_reachable_from(a);
    assert!(table.node(a).is_marked() && table.node(b).is_marked());
    assert_eq!(table.dag_size(b), 2);
}

#[test]
fn test_sweep() {
    let mut table = table(17);
    let [_a, b, c, d, e] = diamond(&table);
    let links_before = table.link_pool().size();
    table.mark_nodes_reachable_from(b);
    assert_eq!(table.sweep(), 1);

    assert_eq!(table.find_if_present(0), None);
    assert_eq!(table.find_if_present(1), Some(b));
    assert_eq!(table.find_if_present(2), Some(c));
    assert_eq!(table.find_if_present(3), Some(d));
    assert_eq!(table.find_if_present(4), Some(e));
    assert_eq!(table.live_nodes(), 4);
    // a -> b のリンクだけが返る
    assert_eq!(table.link_pool().size(), links_before + 1);
    // 印は消えている
    assert!(!table.node(b).is_marked());
    assert_eq!(table.dag_size(b), 4);
}

#[test]
fn test_swept_nodes_are_reused_first() {
    let mut table = table(17);
    let [a, b, ..] = diamond(&table);
    let other = table.find_or_allocate(99).unwrap();
    table.mark_nodes_reachable_from(b);
    assert_eq!(table.sweep(), 2);

    let mut reused = vec![
        table.node_pool().allocate().unwrap(),
        table.node_pool().allocate().unwrap(),
    ];
    reused.sort_unstable();
    let mut swept = vec![a.raw(), other.raw()];
    swept.sort_unstable();
    assert_eq!(reused, swept);
}

#[test]
fn test_sweep_keeps_collision_chains_intact() {
    let mut table = table(17);
    // 同じ開始スロットに3つ並べ、先頭だけ回収する
    table.find_or_allocate(5).unwrap();
    let second = table.find_or_allocate(5 + 17).unwrap();
    let third = table.find_or_allocate(5 + 34).unwrap();
    table.mark_nodes_reachable_from(second);
    table.mark_nodes_reachable_from(third);
    table.sweep();
    assert_eq!(table.find_if_present(5), None);
    assert_eq!(table.find_if_present(5 + 17), Some(second));
    assert_eq!(table.find_if_present(5 + 34), Some(third));
    assert_ne!(table.find_or_allocate(5), None);
}

#[test]
fn test_min_value_fingerprint_maps_in_range() {
    let table = table(17);
    let hash = i64::MIN as u64;
    assert_eq!(table.find_if_present(hash), None);
    let id = table.find_or_allocate(hash).unwrap();
    assert_eq!(table.find_if_present(hash), Some(id));
    let small = i32::MIN as i64 as u64;
    assert!(table.find_or_allocate(small).is_some());
}

#[test]
fn test_clear_returns_everything() {
    let mut table = table(17);
    let [a, ..] = diamond(&table);
    table.mark_nodes_reachable_from(a);
    assert_eq!(table.clear(), 5);
    assert_eq!(table.live_nodes(), 0);
    assert_eq!(table.link_pool().size(), 17 * 3);
}

#[test]
fn test_concurrent_find_or_allocate_shares_nodes() {
    let table = std::sync::Arc::new(table(257));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let table = table.clone();
            std::thread::spawn(move || {
                (0..100u64).map(|fp| table.find_or_allocate(fp).unwrap()).collect::<Vec<_>>()
            })
        })
        .collect();
    let results: Vec<Vec<NodeId>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for other in &results[1..] {
        assert_eq!(other, &results[0]);
    }
    assert_eq!(table.live_nodes(), 100);
}
