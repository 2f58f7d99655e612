//! Driver loop wiring one session to its transport.
//!
//! `run_session` owns the transport and races two inputs: inbound
//! transport events and the session's nudge channel (signalled whenever a
//! local edit lands or state is reset). Between waits it drains the
//! session's submit queue, one operation in flight at a time.

use futures_util::future::{Either, select};
use futures_util::{StreamExt, pin_mut};
use miette::Diagnostic;

use scribe_common::transport::{OtTransport, SubmitOutcome, TransportError, TransportEvent};

use crate::session::DocumentSession;

/// Errors terminating a driver loop.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[diagnostic(code(scribe::driver))]
pub enum DriveError {
    /// `run_session` was called twice for the same session.
    #[error("session is already being driven")]
    AlreadyDriven,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Drive `doc` over `transport` until the session is destroyed or the
/// transport's event stream ends.
///
/// Connect failures are fatal here; retrying with backoff is the caller's
/// call. Submit failures are not: they mark the session errored and the
/// loop keeps serving remote events so a resync can recover it.
pub async fn run_session<T: OtTransport>(
    doc: DocumentSession,
    mut transport: T,
) -> Result<(), DriveError> {
    let mut nudge_rx = doc.take_nudge_rx().ok_or(DriveError::AlreadyDriven)?;

    let info = transport.connect().await?;
    doc.handle_event(TransportEvent::Connected {
        version: info.version,
    });

    let mut events = transport.events();

    while !doc.is_destroyed() {
        while let Some((op, version)) = doc.next_submit() {
            match transport.submit(&op, version).await {
                Ok(SubmitOutcome::Acked { version }) => doc.handle_ack(version),
                Ok(SubmitOutcome::Rejected { reason }) => {
                    doc.handle_reject(&reason);
                }
                Err(err) => {
                    tracing::warn!(id = %doc.id(), %err, "submit failed");
                    doc.handle_submit_error();
                }
            }
        }

        let event = events.next();
        let nudge = nudge_rx.recv();
        pin_mut!(event, nudge);

        match select(event, nudge).await {
            Either::Left((Some(event), _)) => doc.handle_event(event),
            Either::Left((None, _)) => {
                tracing::debug!(id = %doc.id(), "transport event stream ended");
                break;
            }
            // A nudge only means "re-check the submit queue".
            Either::Right((Some(()), _)) => {}
            Either::Right((None, _)) => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_common::transport::{ConnectInfo, RejectReason};
    use scribe_common::{
        CollabUser, ContentType, Entity, EntityType, FieldDef, FieldType, Operation, Path,
    };
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use tokio::task::LocalSet;

    use crate::status::DocStatus;

    /// Transport with pre-scripted connect/submit results and a fixed
    /// inbound event sequence.
    struct ScriptedTransport {
        connect_version: u64,
        outcomes: Rc<RefCell<VecDeque<SubmitOutcome>>>,
        submitted: Rc<RefCell<Vec<(Operation, u64)>>>,
        events: Vec<TransportEvent>,
    }

    impl ScriptedTransport {
        fn new(connect_version: u64) -> Self {
            Self {
                connect_version,
                outcomes: Rc::new(RefCell::new(VecDeque::new())),
                submitted: Rc::new(RefCell::new(Vec::new())),
                events: Vec::new(),
            }
        }

        fn script_outcome(&self, outcome: SubmitOutcome) {
            self.outcomes.borrow_mut().push_back(outcome);
        }
    }

    impl OtTransport for ScriptedTransport {
        async fn connect(&mut self) -> Result<ConnectInfo, TransportError> {
            Ok(ConnectInfo {
                version: self.connect_version,
            })
        }

        async fn submit(
            &mut self,
            op: &Operation,
            version: u64,
        ) -> Result<SubmitOutcome, TransportError> {
            self.submitted.borrow_mut().push((op.clone(), version));
            let outcome = self
                .outcomes
                .borrow_mut()
                .pop_front()
                .ok_or(TransportError::Closed)?;
            Ok(outcome)
        }

        fn events(&mut self) -> futures_util::stream::LocalBoxStream<'static, TransportEvent> {
            if self.events.is_empty() {
                Box::pin(futures_util::stream::pending())
            } else {
                Box::pin(futures_util::stream::iter(std::mem::take(&mut self.events)))
            }
        }
    }

    fn session() -> DocumentSession {
        let content_type =
            ContentType::new("post", vec![FieldDef::new("title", FieldType::Symbol)]);
        DocumentSession::new(
            Entity::new("entry-1", EntityType::Entry).at_version(1),
            content_type,
            CollabUser::new("user-1", "Alice"),
        )
    }

    fn title() -> Path {
        Path::field("title", "en-US")
    }

    async fn settle(doc: &DocumentSession, until: impl Fn(&DocumentSession) -> bool) {
        for _ in 0..100 {
            if until(doc) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("driver did not settle: {doc:?}");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn pre_connect_edit_is_submitted_after_connect() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let doc = session();
                let transport = ScriptedTransport::new(1);
                transport.script_outcome(SubmitOutcome::Acked { version: 2 });
                let submitted = transport.submitted.clone();

                // Edit before the transport is up: buffered, then flushed
                // and submitted by the driver.
                doc.set_value(title(), json!("Hello")).unwrap();

                let driven = doc.clone();
                tokio::task::spawn_local(async move {
                    run_session(driven, transport).await.unwrap();
                });

                settle(&doc, |d| d.version() == 2).await;
                assert_eq!(doc.current_status(), DocStatus::Ok);
                assert_eq!(doc.get_value(&title()), Some(json!("Hello")));

                let sent = submitted.borrow();
                assert_eq!(sent.len(), 1);
                assert_eq!(sent[0].1, 1);

                doc.destroy();
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn edits_submit_sequentially_against_fresh_versions() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let doc = session();
                let transport = ScriptedTransport::new(1);
                transport.script_outcome(SubmitOutcome::Acked { version: 2 });
                transport.script_outcome(SubmitOutcome::Acked { version: 3 });
                let submitted = transport.submitted.clone();

                let driven = doc.clone();
                tokio::task::spawn_local(async move {
                    run_session(driven, transport).await.unwrap();
                });

                settle(&doc, |d| d.current_status() == DocStatus::Ok).await;
                doc.set_value(title(), json!("a")).unwrap();
                doc.set_value(title(), json!("ab")).unwrap();

                settle(&doc, |d| d.version() == 3).await;
                let sent = submitted.borrow();
                assert_eq!(sent.len(), 2);
                // The second submit carries the version the first ack
                // produced.
                assert_eq!(sent[0].1, 1);
                assert_eq!(sent[1].1, 2);

                doc.destroy();
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn rejection_surfaces_as_conflict() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let doc = session();
                let transport = ScriptedTransport::new(1);
                transport.script_outcome(SubmitOutcome::Rejected {
                    reason: RejectReason::VersionMismatch { server_version: 9 },
                });

                let driven = doc.clone();
                tokio::task::spawn_local(async move {
                    run_session(driven, transport).await.unwrap();
                });

                settle(&doc, |d| d.current_status() == DocStatus::Ok).await;
                doc.set_value(title(), json!("stale")).unwrap();

                settle(&doc, |d| d.current_status() == DocStatus::Conflict).await;
                assert_eq!(doc.get_value(&title()), None);

                doc.destroy();
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn remote_events_flow_into_the_session() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let doc = session();
                let mut transport = ScriptedTransport::new(1);
                transport.events = vec![TransportEvent::Remote {
                    op: Operation::Set {
                        path: title(),
                        value: json!("from-peer"),
                    },
                    version: 2,
                }];

                let driven = doc.clone();
                tokio::task::spawn_local(async move {
                    run_session(driven, transport).await.unwrap();
                });

                settle(&doc, |d| d.version() == 2).await;
                assert_eq!(doc.get_value(&title()), Some(json!("from-peer")));

                doc.destroy();
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn second_driver_is_refused() {
        let doc = session();
        assert!(doc.take_nudge_rx().is_some());

        let transport = ScriptedTransport::new(1);
        let err = run_session(doc, transport).await.unwrap_err();
        assert!(matches!(err, DriveError::AlreadyDriven));
    }
}
