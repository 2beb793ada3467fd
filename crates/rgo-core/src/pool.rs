//! 固定容量のフリーリスト・アロケータ
//!
//! 要素は生成時に一括確保し、以後は添字（`u32`）で貸し出す。
//! フリーリストは要素自身が持つ `next` リンクで表す（侵入型）。
//! 枯渇は通常の結果であり、`allocate` は `None` を返すだけでブロックしない。

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

/// リンクの終端
pub const NIL: u32 = u32::MAX;

/// プールに入れられる要素
///
/// `pool_next` はフリーリスト上では次の空き要素を、貸し出し中は
/// 利用側のリスト（子リンク列など）の次要素を指す。
pub trait Poolable: Send + Sync {
    fn pool_next(&self) -> &AtomicU32;
}

/// 固定容量プール
pub struct Pool<T: Poolable> {
    items: Box<[T]>,
    head: Mutex<u32>,
}

impl<T: Poolable> Pool<T> {
    /// `capacity` 個の要素を `make` で作り、すべて空きとして登録する
    pub fn new(capacity: usize, mut make: impl FnMut() -> T) -> Self {
        assert!(capacity < NIL as usize, "pool capacity {capacity} exceeds u32 index space");
        let items: Box<[T]> = (0..capacity).map(|_| make()).collect();
        let pool = Self {
            items,
            head: Mutex::new(NIL),
        };
        for id in 0..capacity as u32 {
            pool.free(id);
        }
        pool
    }

    /// 容量
    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    /// 空き要素を1つ取り出す。枯渇時は `None`
    pub fn allocate(&self) -> Option<u32> {
        let mut head = self.head.lock();
        if *head == NIL {
            return None;
        }
        let id = *head;
        let item = &self.items[id as usize];
        *head = item.pool_next().load(Ordering::Relaxed);
        item.pool_next().store(NIL, Ordering::Relaxed);
        Some(id)
    }

    /// `id` をフリーリストの先頭へ戻し、`id` が直前に指していた要素を返す
    ///
    /// 返り値をたどって `free` を繰り返せば、貸し出し中に組んだリストを
    /// まるごとプールへ戻せる。
    pub fn free(&self, id: u32) -> Option<u32> {
        let mut head = self.head.lock();
        let prev = self.items[id as usize].pool_next().swap(*head, Ordering::Relaxed);
        *head = id;
        (prev != NIL).then_some(prev)
    }

    /// 空き要素数（フリーリストを走査する。診断・テスト用）
    pub fn size(&self) -> usize {
        let head = self.head.lock();
        let mut count = 0;
        let mut cursor = *head;
        while cursor != NIL {
            count += 1;
            cursor = self.items[cursor as usize].pool_next().load(Ordering::Relaxed);
        }
        count
    }

    /// 貸し出し中の要素数
    #[inline]
    pub fn in_use(&self) -> usize {
        self.capacity() - self.size()
    }

    #[inline]
    pub fn get(&self, id: u32) -> &T {
        &self.items[id as usize]
    }
}
