//! 요청 순서 관리.
//!
//! 파일을 연달아 선택하면 여러 파이프라인 호출이 동시에 진행된다.
//! 가장 최근 요청의 결과만 표시되도록, 호출마다 단조 증가 번호를 붙이고
//! 완료 시점에 최신 번호가 아닌 결과는 버린다.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// 요청 번호표
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    /// 번호
    pub fn seq(&self) -> u64 {
        self.0
    }
}

/// 단조 증가 번호 발급기
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    /// 새 발급기
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 번호표 발급 (1부터 시작)
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// 번호표가 현재 최신인지
    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// 마지막으로 발급한 번호 (발급 전이면 0)
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

/// 최신 요청 결과만 보관하는 슬롯
#[derive(Debug)]
pub struct LatestSlot<T> {
    sequencer: RequestSequencer,
    value: Mutex<Option<(Ticket, T)>>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self {
            sequencer: RequestSequencer::new(),
            value: Mutex::new(None),
        }
    }
}

impl<T: Clone> LatestSlot<T> {
    /// 새 슬롯
    pub fn new() -> Self {
        Self::default()
    }

    /// 요청 시작
    pub fn begin(&self) -> Ticket {
        self.sequencer.issue()
    }

    /// 결과 게시
    ///
    /// 완료 시점에 최신 번호표가 아니면 버리고 `false`.
    pub fn publish(&self, ticket: Ticket, value: T) -> bool {
        let mut slot = self.value.lock();
        if !self.sequencer.is_latest(ticket) {
            debug!(
                "오래된 요청 결과 폐기: #{} (최신 #{})",
                ticket.seq(),
                self.sequencer.latest()
            );
            return false;
        }
        *slot = Some((ticket, value));
        true
    }

    /// 마지막으로 게시된 결과
    pub fn get(&self) -> Option<T> {
        self.value.lock().as_ref().map(|(_, v)| v.clone())
    }

    /// 마지막 게시 결과와 번호표
    pub fn get_with_ticket(&self) -> Option<(Ticket, T)> {
        self.value.lock().clone()
    }
}
