//! Merge resolver: combine pre-merge topics that share a grouping identifier.
//!
//! Topics are folded in source order, so the result does not depend on the
//! order they were produced in (per-unit work runs in parallel).

use crate::error::{Diagnostic, Error, Result};
use crate::model::*;
use crate::topic::extend_unique;
use std::collections::HashMap;

/// Merge topics by grouping identifier.
///
/// Returns one topic per identifier, ordered by first appearance in source.
pub fn merge(mut topics: Vec<Topic>) -> Result<Vec<Topic>> {
    topics.sort_by_key(|t| t.order);

    let mut groups: HashMap<String, Topic> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for topic in topics {
        if let Some(existing) = groups.get_mut(&topic.id) {
            absorb(existing, topic)?;
        } else {
            order.push(topic.id.clone());
            groups.insert(topic.id.clone(), topic);
        }
    }

    // Preserve insertion order
    Ok(order.into_iter().filter_map(|id| groups.remove(&id)).collect())
}

/// Fold `later` into `into`. `later` must not precede `into` in source order.
pub fn absorb(into: &mut Topic, later: Topic) -> Result<()> {
    if into.doc_type != later.doc_type {
        return Err(Error::DocTypeConflict {
            id: into.id.clone(),
            first: into.doc_type,
            first_pos: into.pos.clone(),
            second: later.doc_type,
            second_pos: later.pos,
        });
    }

    if later.order < into.order {
        into.order = later.order;
        into.pos = later.pos.clone();
    }

    merge_field(&mut into.title, later.title);
    merge_field(&mut into.description, later.description);
    merge_field(&mut into.details, later.details);
    merge_field(&mut into.usage, later.usage);

    merge_params(&mut into.params, later.params);
    merge_params(&mut into.slots, later.slots);
    merge_params(&mut into.fields, later.fields);

    into.sections.extend(later.sections);
    into.examples.extend(later.examples);
    into.references.extend(later.references);
    into.seealso.extend(later.seealso);

    into.export |= later.export;
    into.no_rd |= later.no_rd;

    extend_unique(&mut into.aliases, later.aliases.iter().map(String::as_str));
    extend_unique(&mut into.families, later.families.iter().map(String::as_str));
    extend_unique(&mut into.keywords, later.keywords.iter().map(String::as_str));
    extend_unique(&mut into.inherit_params, later.inherit_params.iter().map(String::as_str));

    if into.value.is_none() {
        into.value = later.value;
    }
    if into.format.is_none() {
        into.format = later.format;
    }
    if into.source.is_none() {
        into.source = later.source;
    }

    into.declarations.extend(later.declarations);
    Ok(())
}

/// Last explicit value wins; otherwise the first non-empty one stays.
fn merge_field(into: &mut Option<TextField>, later: Option<TextField>) {
    let Some(later) = later else { return };
    if later.explicit || into.is_none() {
        *into = Some(later);
    }
}

/// Concatenate, keeping the first entry for each name.
fn merge_params(into: &mut Vec<Param>, later: Vec<Param>) {
    for p in later {
        if !into.iter().any(|q| q.name == p.name) {
            into.push(p);
        }
    }
}

/// Post-merge pass over the finalized topic set: required-field checks,
/// inherited parameters and family cross-links.
pub fn finalize(topics: &mut [Topic]) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    for t in topics.iter() {
        if t.title_text().trim().is_empty() && !t.no_rd {
            diags.push(Diagnostic::validation(
                t.pos.clone(),
                format!("topic `{}` has no title; it will not be rendered", t.id),
            ));
        }
    }

    inherit_params(topics, &mut diags);
    link_families(topics);
    diags
}

fn inherit_params(topics: &mut [Topic], diags: &mut Vec<Diagnostic>) {
    // Snapshot params by every name a topic is reachable under.
    let mut by_name: HashMap<String, Vec<Param>> = HashMap::new();
    for t in topics.iter() {
        by_name.entry(t.id.clone()).or_insert_with(|| t.params.clone());
        for d in &t.declarations {
            if let Some(name) = d.declaration.name.as_deref() {
                by_name.entry(name.to_string()).or_insert_with(|| t.params.clone());
            }
        }
    }

    for t in topics.iter_mut() {
        if t.inherit_params.is_empty() {
            continue;
        }
        let mut formals: Vec<String> = Vec::new();
        for d in &t.declarations {
            extend_unique(&mut formals, d.declaration.formal_names().iter().map(String::as_str));
        }

        for source in t.inherit_params.clone() {
            let Some(params) = by_name.get(&source) else {
                diags.push(Diagnostic::warning(
                    t.pos.clone(),
                    format!("`@inheritParams {source}`: no such topic"),
                ));
                continue;
            };
            for formal in &formals {
                if t.params.iter().any(|p| p.covers(formal)) {
                    continue;
                }
                if let Some(p) = params.iter().find(|p| p.covers(formal)) {
                    t.params.push(Param {
                        name: formal.clone(),
                        description: p.description.clone(),
                    });
                }
            }
        }
    }
}

fn link_families(topics: &mut [Topic]) {
    let mut members: HashMap<String, Vec<String>> = HashMap::new();
    for t in topics.iter() {
        for f in &t.families {
            members.entry(f.clone()).or_default().push(t.id.clone());
        }
    }
    for list in members.values_mut() {
        list.sort();
    }

    for t in topics.iter_mut() {
        for f in t.families.clone() {
            let others: Vec<String> = members[&f]
                .iter()
                .filter(|id| **id != t.id)
                .map(|id| format!("\\code{{\\link{{{id}}}}}"))
                .collect();
            if !others.is_empty() {
                t.seealso.push(format!("Other {}: {}", f, others.join(", ")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: &str, unit: usize, line: usize) -> Topic {
        let mut t = Topic::new(
            id,
            DocType::Function,
            SourceOrder { unit, line },
            SourcePos::new(format!("u{unit}.R"), line),
        );
        t.declarations.push(Documented {
            unit: format!("u{unit}.R"),
            declaration: Declaration::new(DeclKind::Function, Some(format!("{id}_{line}")), line),
            s3: false,
            export_names: Vec::new(),
        });
        t
    }

    fn param(name: &str, desc: &str) -> Param {
        Param {
            name: name.into(),
            description: desc.into(),
        }
    }

    fn abc() -> (Topic, Topic, Topic) {
        let mut a = topic("g", 0, 1);
        a.title = Some(TextField::inferred("A title"));
        a.params = vec![param("x", "from A")];
        a.aliases = vec!["ga".into()];

        let mut b = topic("g", 0, 10);
        b.title = Some(TextField::explicit("B explicit"));
        b.description = Some(TextField::inferred("B desc"));
        b.params = vec![param("x", "from B"), param("y", "from B")];
        b.export = true;
        b.aliases = vec!["gb".into(), "ga".into()];

        let mut c = topic("g", 1, 1);
        c.title = Some(TextField::inferred("C title"));
        c.description = Some(TextField::explicit("C desc"));
        c.sections.push(Section {
            title: "S".into(),
            body: "b".into(),
            subsections: Vec::new(),
        });
        (a, b, c)
    }

    #[test]
    fn single_topic_passes_through() {
        let t = topic("f", 0, 1);
        let out = merge(vec![t.clone()]).unwrap();
        assert_eq!(out, vec![t]);
    }

    #[test]
    fn merge_rules() {
        let (a, b, c) = abc();
        let out = merge(vec![a, b, c]).unwrap();
        assert_eq!(out.len(), 1);
        let g = &out[0];
        assert_eq!(g.title_text(), "B explicit");
        assert_eq!(g.description.as_ref().unwrap().text, "C desc");
        assert_eq!(g.params, vec![param("x", "from A"), param("y", "from B")]);
        assert!(g.export);
        assert_eq!(g.aliases, vec!["ga", "gb"]);
        assert_eq!(g.declarations.len(), 3);
        assert_eq!(g.sections.len(), 1);
    }

    #[test]
    fn merge_is_associative() {
        let (a, b, c) = abc();

        let mut left = a.clone();
        absorb(&mut left, b.clone()).unwrap();
        absorb(&mut left, c.clone()).unwrap();

        let mut bc = b;
        absorb(&mut bc, c).unwrap();
        let mut right = a;
        absorb(&mut right, bc).unwrap();

        assert_eq!(left, right);
    }

    #[test]
    fn input_order_does_not_matter() {
        let (a, b, c) = abc();
        let forward = merge(vec![a.clone(), b.clone(), c.clone()]).unwrap();
        let reversed = merge(vec![c.clone(), b.clone(), a.clone()]).unwrap();
        let shuffled = merge(vec![b, c, a]).unwrap();
        assert_eq!(forward, reversed);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn last_explicit_wins() {
        let mut a = topic("g", 0, 1);
        a.title = Some(TextField::explicit("first"));
        let mut b = topic("g", 0, 5);
        b.title = Some(TextField::explicit("second"));
        let mut c = topic("g", 0, 9);
        c.title = Some(TextField::inferred("inferred"));
        let out = merge(vec![c, b, a]).unwrap();
        assert_eq!(out[0].title_text(), "second");
    }

    #[test]
    fn doc_type_conflict_is_fatal() {
        let a = topic("g", 0, 1);
        let mut b = topic("g", 0, 5);
        b.doc_type = DocType::Data;
        let err = merge(vec![a, b]).unwrap_err();
        assert!(matches!(err, Error::DocTypeConflict { .. }));
    }

    #[test]
    fn distinct_ids_keep_source_order() {
        let out = merge(vec![topic("b", 1, 1), topic("a", 0, 4)]).unwrap();
        let ids: Vec<_> = out.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn finalize_flags_missing_title() {
        let mut topics = vec![topic("f", 0, 1)];
        let diags = finalize(&mut topics);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].is_error());
    }

    #[test]
    fn inherit_params_fills_missing_formals() {
        let mut base = topic("base", 0, 1);
        base.title = Some(TextField::inferred("Base"));
        base.params = vec![param("x,y", "Coordinates"), param("data", "A frame")];

        let mut child = topic("child", 0, 20);
        child.title = Some(TextField::inferred("Child"));
        child.declarations[0].declaration.formals = Some("data, y, z".into());
        child.params = vec![param("z", "Own")];
        child.inherit_params = vec!["base".into(), "missing".into()];

        let mut topics = vec![base, child];
        let diags = finalize(&mut topics);
        let names: Vec<_> = topics[1].params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["z", "data", "y"]);
        assert_eq!(topics[1].params[2].description, "Coordinates");
        assert_eq!(diags.len(), 1);
        assert!(!diags[0].is_error());
    }

    #[test]
    fn families_cross_link() {
        let mut a = topic("arrange", 0, 1);
        a.title = Some(TextField::inferred("A"));
        a.families = vec!["verbs".into()];
        let mut f = topic("filter", 0, 9);
        f.title = Some(TextField::inferred("F"));
        f.families = vec!["verbs".into()];
        let mut m = topic("mutate", 0, 20);
        m.title = Some(TextField::inferred("M"));
        m.families = vec!["verbs".into()];

        let mut topics = vec![m, a, f];
        finalize(&mut topics);
        assert_eq!(
            topics[0].seealso,
            vec!["Other verbs: \\code{\\link{arrange}}, \\code{\\link{filter}}"]
        );
    }
}
