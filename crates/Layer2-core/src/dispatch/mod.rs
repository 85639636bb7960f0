//! # Event Dispatch
//!
//! 브라우저에서 발생한 컴포넌트 이벤트를 활성 플러그인들의 핸들러 체인으로
//! 라우팅하고, 결과를 하나의 응답으로 병합한다.
//!
//! ```text
//! DispatchRequest ──▶ HandlerTable::resolve ──▶ [h1(10), h2(5), h3(5), h4(0)]
//!                                                  │
//!                         sync: timeout 안에서 대기 │ async: 백그라운드 실행
//!                                                  ▼
//!                                   aggregate(MergePolicy) ──▶ EventResult
//! ```

mod aggregate;
mod binding;
mod dispatcher;
mod table;
mod types;

pub use binding::{handler_fn, EventHandler, EventHandlerBinding, WILDCARD};
pub use dispatcher::EventDispatcher;
pub use table::{HandlerTable, ResolvedHandler};
pub use types::{
    BroadcastEvent, DispatchRequest, EventContext, EventResult, EventSource, EventStatus,
    FrontendCommand,
};
