//! Incremental accumulation of streamed tool-call fragments
//!
//! The model streams function calls token-by-token: the first fragment for a
//! call carries its `id` and (usually) the function name, later fragments
//! carry slices of the name or the JSON argument string. Fragments are keyed
//! by a per-response integer index; when several calls stream in parallel
//! their fragments may interleave across indices, so accumulation must be
//! keyed by index rather than arrival sequence.

use std::collections::BTreeMap;

use crate::llm::{StreamEvent, ToolCall, ToolCallFragment};

/// Builder state for one in-progress tool call
#[derive(Debug, Default)]
struct ToolCallBuilder {
    id: String,
    name: String,
    arguments: String,
}

/// Assembles [`ToolCall`]s from stream fragments, keyed by index
///
/// Per-index fragment concatenation follows arrival order; the finalized
/// list is ordered by ascending index, which is the order the model emitted
/// the calls.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    calls: BTreeMap<u32, ToolCallBuilder>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one fragment, returning the event it produced (if any)
    pub fn apply(&mut self, fragment: &ToolCallFragment) -> Option<StreamEvent> {
        let seen = self.calls.contains_key(&fragment.index);
        let builder = self.calls.entry(fragment.index).or_default();

        if let Some(id) = &fragment.id {
            builder.id.push_str(id);
        }
        if let Some(function) = &fragment.function {
            if let Some(name) = &function.name {
                builder.name.push_str(name);
            }
            if let Some(arguments) = &function.arguments {
                builder.arguments.push_str(arguments);
            }
        }

        if !seen {
            Some(StreamEvent::ToolCallStart {
                index: fragment.index,
                id: builder.id.clone(),
                name: builder.name.clone(),
            })
        } else {
            fragment
                .function
                .as_ref()
                .and_then(|f| f.arguments.as_ref())
                .map(|arguments| StreamEvent::ToolCallDelta {
                    index: fragment.index,
                    arguments_delta: arguments.clone(),
                })
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Finalize into tool calls ordered by index
    pub fn finish(self) -> Vec<ToolCall> {
        self.calls
            .into_values()
            .map(|b| ToolCall {
                id: b.id,
                name: b.name,
                arguments: b.arguments,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FunctionFragment;

    fn fragment(
        index: u32,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) -> ToolCallFragment {
        ToolCallFragment {
            index,
            id: id.map(String::from),
            function: Some(FunctionFragment {
                name: name.map(String::from),
                arguments: arguments.map(String::from),
            }),
        }
    }

    #[test]
    fn test_single_call_accumulates_arguments() {
        let mut assembler = ToolCallAssembler::new();
        assembler.apply(&fragment(0, Some("call_1"), Some("search_transactions"), Some("")));
        assembler.apply(&fragment(0, None, None, Some("{\"category\":")));
        assembler.apply(&fragment(0, None, None, Some("\"餐饮\"}")));

        let calls = assembler.finish();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "search_transactions");
        assert_eq!(calls[0].arguments, "{\"category\":\"餐饮\"}");
    }

    #[test]
    fn test_name_fragments_concatenate() {
        // Split name fragments must produce the same call as an atomic one.
        let mut split = ToolCallAssembler::new();
        split.apply(&fragment(0, Some("call_1"), Some("get_f"), None));
        split.apply(&fragment(0, None, Some("inancial_health"), None));

        let mut atomic = ToolCallAssembler::new();
        atomic.apply(&fragment(0, Some("call_1"), Some("get_financial_health"), None));

        assert_eq!(split.finish(), atomic.finish());
    }

    #[test]
    fn test_interleaved_indices_stay_separate() {
        let mut assembler = ToolCallAssembler::new();
        assembler.apply(&fragment(0, Some("call_a"), Some("tool_a"), Some("{\"x\":")));
        assembler.apply(&fragment(1, Some("call_b"), Some("tool_b"), Some("{\"y\":")));
        assembler.apply(&fragment(0, None, None, Some("1}")));
        assembler.apply(&fragment(1, None, None, Some("2}")));

        let calls = assembler.finish();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments, "{\"x\":1}");
        assert_eq!(calls[1].arguments, "{\"y\":2}");
    }

    #[test]
    fn test_finish_orders_by_index_not_arrival() {
        let mut assembler = ToolCallAssembler::new();
        assembler.apply(&fragment(1, Some("call_b"), Some("second"), None));
        assembler.apply(&fragment(0, Some("call_a"), Some("first"), None));

        let calls = assembler.finish();
        assert_eq!(calls[0].name, "first");
        assert_eq!(calls[1].name, "second");
    }

    #[test]
    fn test_first_fragment_emits_start_then_deltas() {
        let mut assembler = ToolCallAssembler::new();
        let first = assembler.apply(&fragment(0, Some("call_1"), Some("tool"), None));
        assert!(matches!(first, Some(StreamEvent::ToolCallStart { .. })));

        let second = assembler.apply(&fragment(0, None, None, Some("{}")));
        match second {
            Some(StreamEvent::ToolCallDelta {
                index,
                arguments_delta,
            }) => {
                assert_eq!(index, 0);
                assert_eq!(arguments_delta, "{}");
            }
            other => panic!("expected ToolCallDelta, got {:?}", other),
        }
    }
}
