use watchword_engine::{MemoryDocument, Mutation, NodeId};

/// Mirrors a transcript file into the in-memory document, one monitored
/// paragraph per line, and turns successive snapshots into the mutation
/// batches a live observer would have reported for the same edit.
pub struct TranscriptMirror {
    lines: Vec<(NodeId, String)>,
}

impl TranscriptMirror {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Applies a fresh file snapshot to `doc` and returns the resulting
    /// mutations. In-place line edits become character-data mutations on
    /// the existing node; appended lines become one child-list addition;
    /// a shorter file becomes one child-list removal of the trailing nodes.
    pub fn apply_snapshot(&mut self, doc: &mut MemoryDocument, text: &str) -> Vec<Mutation> {
        let new_lines: Vec<&str> = text.lines().collect();
        let mut mutations = Vec::new();

        let shared = self.lines.len().min(new_lines.len());
        for (idx, line) in new_lines.iter().take(shared).enumerate() {
            let (id, cached) = &mut self.lines[idx];
            if cached != line {
                doc.set_text(*id, *line);
                *cached = (*line).to_string();
                mutations.push(Mutation::CharacterData { target: *id });
            }
        }

        if new_lines.len() > self.lines.len() {
            let root = doc.root();
            let start = self.lines.len();
            let mut added = Vec::new();
            for line in &new_lines[start..] {
                let id = doc.append_child(root, "p", *line);
                self.lines.push((id, (*line).to_string()));
                added.push(id);
            }
            mutations.push(Mutation::ChildList {
                added,
                removed: Vec::new(),
            });
        } else if new_lines.len() < self.lines.len() {
            let mut removed = Vec::new();
            for (id, _) in self.lines.drain(new_lines.len()..) {
                removed.extend(doc.remove(id));
            }
            mutations.push(Mutation::ChildList {
                added: Vec::new(),
                removed,
            });
        }

        mutations
    }
}

impl Default for TranscriptMirror {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::TranscriptMirror;
    use watchword_engine::{DocumentView, MemoryDocument, Mutation};

    #[test]
    fn first_snapshot_appends_one_node_per_line() {
        let mut doc = MemoryDocument::new();
        let mut mirror = TranscriptMirror::new();

        let mutations = mirror.apply_snapshot(&mut doc, "hello\nworld\n");
        assert_eq!(mutations.len(), 1);
        let Mutation::ChildList { added, removed } = &mutations[0] else {
            panic!("expected child-list mutation");
        };
        assert_eq!(added.len(), 2);
        assert!(removed.is_empty());
        assert_eq!(doc.text_of(added[0]).as_deref(), Some("hello"));
        assert_eq!(doc.text_of(added[1]).as_deref(), Some("world"));
    }

    #[test]
    fn edited_line_becomes_character_data_on_the_same_node() {
        let mut doc = MemoryDocument::new();
        let mut mirror = TranscriptMirror::new();

        let mutations = mirror.apply_snapshot(&mut doc, "hello\nworld\n");
        let Mutation::ChildList { added, .. } = &mutations[0] else {
            panic!("expected child-list mutation");
        };
        let second = added[1];

        let mutations = mirror.apply_snapshot(&mut doc, "hello\nthere\n");
        assert_eq!(
            mutations,
            vec![Mutation::CharacterData { target: second }]
        );
        assert_eq!(doc.text_of(second).as_deref(), Some("there"));
    }

    #[test]
    fn truncated_file_removes_trailing_nodes() {
        let mut doc = MemoryDocument::new();
        let mut mirror = TranscriptMirror::new();

        let mutations = mirror.apply_snapshot(&mut doc, "one\ntwo\nthree\n");
        let Mutation::ChildList { added, .. } = &mutations[0] else {
            panic!("expected child-list mutation");
        };
        let trailing = added[1..].to_vec();

        let mutations = mirror.apply_snapshot(&mut doc, "one\n");
        assert_eq!(mutations.len(), 1);
        let Mutation::ChildList { added, removed } = &mutations[0] else {
            panic!("expected child-list mutation");
        };
        assert!(added.is_empty());
        assert_eq!(removed, &trailing);
        assert!(doc.text_of(trailing[0]).is_none());
    }

    #[test]
    fn unchanged_snapshot_yields_no_mutations() {
        let mut doc = MemoryDocument::new();
        let mut mirror = TranscriptMirror::new();

        mirror.apply_snapshot(&mut doc, "steady\n");
        assert!(mirror.apply_snapshot(&mut doc, "steady\n").is_empty());
    }
}
