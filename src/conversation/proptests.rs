//! Property tests over arbitrary event sequences.

use proptest::prelude::*;

use super::*;
use crate::types::{Message, Role};

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z ]{0,8}".prop_map(Event::EditInput),
        Just(Event::Submit),
        "[a-z]{1,6}".prop_map(|t| Event::Stream(StreamEvent::Fragment(t))),
        Just(Event::Stream(StreamEvent::Completed)),
        Just(Event::Stream(StreamEvent::Failed("boom".into()))),
        Just(Event::Stream(StreamEvent::Cancelled)),
        "[a-z]{1,6}\\.pdf"
            .prop_map(|name| Event::IngestRequested(DocumentUpload::new(name, Vec::new()))),
        (0u64..20).prop_map(|chunks| Event::IngestSucceeded(IngestReport { chunks })),
        Just(Event::IngestFailed("nope".into())),
        any::<bool>().prop_map(Event::SetRagEnabled),
        Just(Event::ClearDocument),
    ]
}

proptest! {
    #[test]
    fn rag_enabled_implies_ingested(events in proptest::collection::vec(arb_event(), 0..60)) {
        let mut state = ConversationState::new().with_credential("k1");
        for event in events {
            state = transition(state, event).state;
            prop_assert!(!state.rag().is_enabled() || state.rag().is_ingested());
        }
    }

    #[test]
    fn history_is_append_only(events in proptest::collection::vec(arb_event(), 0..60)) {
        let mut state = ConversationState::new().with_credential("k1");
        for event in events {
            let before: Vec<Message> = state.messages().to_vec();
            let reply = state.in_flight_reply().cloned();
            state = transition(state, event).state;

            let after = state.messages();
            prop_assert!(after.len() >= before.len());
            for (i, (old, new)) in before.iter().zip(after).enumerate() {
                prop_assert_eq!(old.role, new.role);
                let growing = reply.as_ref() == Some(old) && new.content.starts_with(&old.content);
                prop_assert!(old == new || growing, "message {} changed", i);
            }
        }
    }

    #[test]
    fn at_most_one_request_in_flight(events in proptest::collection::vec(arb_event(), 0..60)) {
        let mut state = ConversationState::new().with_credential("k1");
        for event in events {
            let was_awaiting = !state.is_idle();
            let users_before = state.messages().iter().filter(|m| m.role == Role::User).count();
            let t = transition(state, event);
            state = t.state;

            if was_awaiting {
                prop_assert!(!matches!(t.effect, Some(Effect::SendCompletion(_))));
                let users_after = state.messages().iter().filter(|m| m.role == Role::User).count();
                prop_assert_eq!(users_before, users_after);
            }
        }
    }
}
