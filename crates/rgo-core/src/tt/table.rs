//! TranspositionTable本体
//!
//! - スロット配列: ノード添字を線形探索で格納
//! - ノードプール（容量 = スロット数）とリンクプール
//! - mark / sweep によるノード回収

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use super::node::{ChildLink, SearchNode};
use crate::pool::{NIL, Pool};
use crate::types::Move;

/// ノードプール上の添字
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// 置換表
pub struct TranspositionTable {
    slots: Box<[AtomicU32]>,
    nodes: Pool<SearchNode>,
    links: Pool<ChildLink>,
    /// 構造変更（ノードの確保とスロットへの登録）の排他
    structure: Mutex<()>,
    point_count: usize,
}

impl TranspositionTable {
    /// `slot_count` スロット、子リンク `link_capacity` 本の表を作る
    pub fn new(slot_count: usize, point_count: usize, link_capacity: usize) -> Self {
        assert!(slot_count > 0, "table needs at least one slot");
        Self {
            slots: (0..slot_count).map(|_| AtomicU32::new(NIL)).collect(),
            nodes: Pool::new(slot_count, || SearchNode::new(point_count)),
            links: Pool::new(link_capacity, ChildLink::new),
            structure: Mutex::new(()),
            point_count,
        }
    }

    /// スロット数（= ノード容量）
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// 探索開始スロット。符号なしで剰余を取るので全ての値が範囲内に入る
    #[inline]
    fn slot_index(&self, fingerprint: u64) -> usize {
        (fingerprint % self.slots.len() as u64) as usize
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &SearchNode {
        self.nodes.get(id.0)
    }

    /// 線形探索。見つかれば `Ok(id)`、空きスロットで止まれば `Err(Some(slot))`、
    /// 全スロットを見ても無ければ `Err(None)`
    fn find_slot(&self, fingerprint: u64) -> Result<NodeId, Option<usize>> {
        let len = self.slots.len();
        let start = self.slot_index(fingerprint);
        for step in 0..len {
            let slot = (start + step) % len;
            let id = self.slots[slot].load(Ordering::Acquire);
            if id == NIL {
                return Err(Some(slot));
            }
            if self.nodes.get(id).fingerprint() == fingerprint {
                return Ok(NodeId(id));
            }
        }
        Err(None)
    }

    /// 登録済みなら返す。確保はしない（ロックも取らない）
    pub fn find_if_present(&self, fingerprint: u64) -> Option<NodeId> {
        self.find_slot(fingerprint).ok()
    }

    /// 登録済みならそのノード、無ければ新しく確保して登録する
    ///
    /// プール（= スロット）が尽きていれば `None`。
    pub fn find_or_allocate(&self, fingerprint: u64) -> Option<NodeId> {
        if let Some(id) = self.find_if_present(fingerprint) {
            return Some(id);
        }
        let _guard = self.structure.lock();
        // ロック待ちの間に他のワーカーが登録しているかもしれない
        let slot = match self.find_slot(fingerprint) {
            Ok(id) => return Some(id),
            Err(slot) => slot?,
        };
        let id = self.nodes.allocate()?;
        self.nodes.get(id).reset(fingerprint);
        self.slots[slot].store(id, Ordering::Release);
        Some(NodeId(id))
    }

    /// `parent` の子リンク列の先頭に `child` を加える
    ///
    /// 同じ子を何度加えてもよい（多重集合）。リンクが尽きていれば `false`。
    pub fn add_child(&self, parent: NodeId, child: NodeId) -> bool {
        let Some(link_id) = self.links.allocate() else {
            return false;
        };
        let link = self.links.get(link_id);
        link.set_child(child.0);
        let head = self.node(parent).children_head();
        let mut current = head.load(Ordering::Acquire);
        loop {
            link.set_next(current);
            match head.compare_exchange_weak(current, link_id, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// 手 `mv` で `parent` から `child` に至ったことを記録する
    ///
    /// 同じ手のリンクは1本だけ張る。リンクを張れなかったときだけ `false`。
    pub fn link_child(&self, parent: NodeId, mv: Move, child: NodeId) -> bool {
        let node = self.node(parent);
        if !node.claim_child(mv) {
            return true;
        }
        if self.add_child(parent, child) {
            true
        } else {
            node.release_child(mv);
            false
        }
    }

    /// `node` の子を列挙する（重複あり）
    pub fn children(&self, node: NodeId) -> Children<'_> {
        Children {
            table: self,
            cursor: self.node(node).children_head().load(Ordering::Acquire),
        }
    }

    /// `root` から到達可能なノードを深さ優先でたどる
    ///
    /// `visit` が `false` を返したノード（訪問済み）の先はたどらない。
    fn traverse(&self, root: NodeId, mut visit: impl FnMut(NodeId) -> bool) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visit(id) {
                continue;
            }
            stack.extend(self.children(id));
        }
    }

    /// `root` から到達可能な全ノード（`root` 自身を含む）に印を付ける
    pub fn mark_nodes_reachable_from(&self, root: NodeId) {
        self.traverse(root, |id| !self.node(id).mark());
    }

    /// `root` から到達可能な相異なるノードの数
    pub fn dag_size(&self, root: NodeId) -> usize {
        let mut visited = vec![false; self.capacity()];
        let mut count = 0;
        self.traverse(root, |id| {
            let seen = std::mem::replace(&mut visited[id.0 as usize], true);
            if !seen {
                count += 1;
            }
            !seen
        });
        count
    }

    /// 印のないノードとその子リンクをプールへ返し、残ったノードの印を消す
    ///
    /// 排他アクセスが必要（ワーカー停止中にのみ呼ぶ）。
    /// 線形探索の連鎖を保つため、残ったノードはスロットへ登録し直す。
    /// 戻り値は回収したノード数。
    pub fn sweep(&mut self) -> usize {
        let mut survivors = Vec::new();
        let mut freed = 0;
        for slot in self.slots.iter() {
            let id = slot.swap(NIL, Ordering::Relaxed);
            if id == NIL {
                continue;
            }
            let node = self.nodes.get(id);
            if node.is_marked() {
                node.unmark();
                survivors.push((id, node.fingerprint()));
                continue;
            }
            let mut cursor = node.children_head().swap(NIL, Ordering::Relaxed);
            while cursor != NIL {
                cursor = self.links.free(cursor).unwrap_or(NIL);
            }
            self.nodes.free(id);
            freed += 1;
        }
        let len = self.slots.len();
        for (id, fingerprint) in survivors {
            let start = self.slot_index(fingerprint);
            if let Some(slot) = (0..len)
                .map(|step| (start + step) % len)
                .find(|&slot| self.slots[slot].load(Ordering::Relaxed) == NIL)
            {
                self.slots[slot].store(id, Ordering::Relaxed);
            }
        }
        freed
    }

    /// 全ノードを回収する
    pub fn clear(&mut self) -> usize {
        for slot in self.slots.iter() {
            let id = slot.load(Ordering::Relaxed);
            if id != NIL {
                self.nodes.get(id).unmark();
            }
        }
        self.sweep()
    }

    /// 使用中のノード数
    pub fn live_nodes(&self) -> usize {
        self.nodes.in_use()
    }

    pub fn node_pool(&self) -> &Pool<SearchNode> {
        &self.nodes
    }

    pub fn link_pool(&self) -> &Pool<ChildLink> {
        &self.links
    }
}

/// `TranspositionTable::children` のイテレータ
pub struct Children<'a> {
    table: &'a TranspositionTable,
    cursor: u32,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.cursor == NIL {
            return None;
        }
        let link = self.table.links.get(self.cursor);
        self.cursor = link.next();
        Some(NodeId(link.child()))
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("capacity", &self.capacity())
            .field("live_nodes", &self.live_nodes())
            .field("free_links", &self.links.size())
            .finish()
    }
}
