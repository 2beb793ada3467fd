//! 探索停止の合図
//!
//! ワーカーはシミュレーションの合間に `is_stopped` を見るだけで、
//! シミュレーション途中では止まらない。コントローラは `wait_timeout` で
//! タイムスライスの経過か停止要求のどちらか早い方まで眠る。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// 停止フラグと、それを待つための条件変数
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// 停止を要求し、待っているスレッドを起こす
    pub fn stop(&self) {
        let _guard = self.lock.lock();
        self.stopped.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    /// 新しいセッションのためにフラグを下ろす
    pub fn reset(&self) {
        let _guard = self.lock.lock();
        self.stopped.store(false, Ordering::Release);
    }

    /// 停止要求か `timeout` 経過まで待つ。停止要求で起きたら `true`
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while !self.is_stopped() {
            if self.condvar.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        self.is_stopped()
    }

    /// 停止要求まで待つ
    pub fn wait(&self) {
        let mut guard = self.lock.lock();
        while !self.is_stopped() {
            self.condvar.wait(&mut guard);
        }
    }
}

/// 外部（別スレッド）から探索を打ち切るためのハンドル
#[derive(Debug, Clone)]
pub struct StopHandle {
    signal: Arc<StopSignal>,
}

impl StopHandle {
    pub(crate) fn new(signal: Arc<StopSignal>) -> Self {
        Self { signal }
    }

    /// 実行中の探索を止める（時間切れと同じ扱い）
    pub fn stop(&self) {
        self.signal.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.signal.is_stopped()
    }
}

/// 1セッションあたりのシミュレーション回数の上限
#[derive(Debug, Default)]
pub(crate) struct PlayoutBudget {
    claimed: AtomicU64,
    completed: AtomicU64,
    limit: AtomicU64,
}

impl PlayoutBudget {
    /// `limit == 0` は無制限
    pub(crate) fn reset(&self, limit: u64) {
        self.limit.store(limit, Ordering::Relaxed);
        self.claimed.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Release);
    }

    /// シミュレーション1回分の権利を取る。上限に達していれば `false`
    #[inline]
    pub(crate) fn claim(&self) -> bool {
        let limit = self.limit.load(Ordering::Relaxed);
        limit == 0 || self.claimed.fetch_add(1, Ordering::AcqRel) < limit
    }

    /// 権利を取ったシミュレーションが終わった。上限に達したら `true`
    #[inline]
    pub(crate) fn complete(&self) -> bool {
        let done = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        let limit = self.limit.load(Ordering::Relaxed);
        limit != 0 && done >= limit
    }

    #[inline]
    pub(crate) fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_timeout_expires() {
        let signal = StopSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn test_stop_wakes_waiter() {
        let signal = Arc::new(StopSignal::new());
        let waiter = {
            let signal = signal.clone();
            std::thread::spawn(move || signal.wait_timeout(Duration::from_secs(30)))
        };
        std::thread::sleep(Duration::from_millis(10));
        StopHandle::new(signal.clone()).stop();
        assert!(waiter.join().unwrap());
        signal.reset();
        assert!(!signal.is_stopped());
    }

    #[test]
    fn test_stop_before_wait_is_not_lost() {
        let signal = StopSignal::new();
        signal.stop();
        signal.wait();
        assert!(signal.wait_timeout(Duration::from_secs(30)));
    }

    #[test]
    fn test_playout_budget() {
        let budget = PlayoutBudget::default();
        budget.reset(2);
        assert!(budget.claim());
        assert!(budget.claim());
        assert!(!budget.claim());
        assert!(!budget.complete());
        assert!(budget.complete());
        assert_eq!(budget.completed(), 2);

        budget.reset(0);
        assert!((0..100).all(|_| budget.claim()));
        assert!(!budget.complete());
    }
}
