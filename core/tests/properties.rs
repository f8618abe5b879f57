use irlab_core::codec::{read_index, write_index};
use irlab_core::evaluation::{average_precision, reciprocal_rank, Evaluation, QueryMetrics, RelevanceJudgments};
use irlab_core::indexer::{document_weights, new_indexer, Indexer};
use irlab_core::retrieval::{build_retrieval, Retrieval};
use irlab_core::scoring::ScoringAlgorithm;
use irlab_core::tokenizer::{SimpleTokenizer, TokenizerKind};
use irlab_core::{DocId, InvertedIndex, WeightScheme};
use proptest::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

const VOCAB: &[&str] = &["lift", "drag", "wing", "flow", "mach", "shock", "wake", "heat"];

fn document() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(VOCAB), 0..12)
        .prop_map(|words| words.into_iter().map(str::to_string).collect())
}

fn collection() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(document(), 1..15)
}

/// Documents paired with a random permutation of the ids `1..=n`.
fn shuffled_collection() -> impl Strategy<Value = Vec<(DocId, Vec<String>)>> {
    collection()
        .prop_flat_map(|docs| {
            let ids: Vec<DocId> = (1..=docs.len() as DocId).collect();
            (Just(docs), Just(ids).prop_shuffle())
        })
        .prop_map(|(docs, ids)| ids.into_iter().zip(docs).collect())
}

fn build(docs: &[Vec<String>], scheme: WeightScheme) -> InvertedIndex {
    let numbered: Vec<(DocId, Vec<String>)> =
        docs.iter().enumerate().map(|(i, terms)| (i as DocId + 1, terms.clone())).collect();
    build_with_ids(&numbered, scheme)
}

fn build_with_ids(docs: &[(DocId, Vec<String>)], scheme: WeightScheme) -> InvertedIndex {
    let mut indexer = new_indexer(scheme, TokenizerKind::Simple);
    for (doc_id, terms) in docs {
        indexer.index(terms, *doc_id);
    }
    indexer.into_inverted_index()
}

fn squared_norms(index: &InvertedIndex) -> HashMap<DocId, f64> {
    let mut norms: HashMap<DocId, f64> = HashMap::new();
    for (_, postings) in index.iter() {
        for p in postings {
            *norms.entry(p.doc_id).or_insert(0.0) += p.weight * p.weight;
        }
    }
    norms
}

proptest! {
    #[test]
    fn document_weights_have_unit_norm(terms in document()) {
        let weights = document_weights(&terms);
        let sum: f64 = weights.iter().map(|(_, w)| w * w).sum();
        if terms.is_empty() {
            prop_assert!(weights.is_empty());
        } else {
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn frequency_index_survives_the_codec(docs in collection()) {
        let index = build(&docs, WeightScheme::Frequency);
        let mut buf = Vec::new();
        write_index(&mut buf, &index).unwrap();
        let decoded = read_index(buf.as_slice(), WeightScheme::Frequency).unwrap();

        prop_assert_eq!(decoded.num_docs(), index.num_docs());
        prop_assert_eq!(decoded.tokenizer(), index.tokenizer());
        prop_assert_eq!(decoded.len(), index.len());
        for (term, postings) in index.iter() {
            prop_assert_eq!(decoded.postings(term), Some(postings));
        }
    }

    #[test]
    fn weighted_index_survives_the_codec_to_five_decimals(docs in collection()) {
        let index = build(&docs, WeightScheme::Weighted);

        // every document with at least one term stores a unit-length vector
        let norms = squared_norms(&index);
        let non_empty = docs.iter().filter(|terms| !terms.is_empty()).count();
        prop_assert_eq!(norms.len(), non_empty);
        for sum in norms.values() {
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }

        let mut buf = Vec::new();
        write_index(&mut buf, &index).unwrap();
        let decoded = read_index(buf.as_slice(), WeightScheme::Weighted).unwrap();

        for (term, postings) in index.iter() {
            let read_back = decoded.postings(term).unwrap();
            prop_assert_eq!(read_back.len(), postings.len());
            for (a, b) in read_back.iter().zip(postings) {
                prop_assert_eq!(a.doc_id, b.doc_id);
                prop_assert!((a.weight - b.weight).abs() <= 6e-6);
            }
        }
        for sum in squared_norms(&decoded).values() {
            prop_assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn saved_postings_are_in_strict_document_order(docs in shuffled_collection()) {
        for scheme in [WeightScheme::Frequency, WeightScheme::Weighted] {
            let index = build_with_ids(&docs, scheme);
            let mut buf = Vec::new();
            write_index(&mut buf, &index).unwrap();
            let decoded = read_index(buf.as_slice(), scheme).unwrap();

            prop_assert_eq!(decoded.len(), index.len());
            for (term, postings) in decoded.iter() {
                prop_assert!(
                    postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id),
                    "postings of {:?} out of order: {:?}",
                    term,
                    postings
                );
                prop_assert_eq!(postings.len(), index.doc_freq(term));
            }
        }
    }

    #[test]
    fn adding_a_query_term_never_lowers_a_score(
        docs in collection(),
        query in prop::collection::vec(prop::sample::select(VOCAB), 1..4),
        extra in prop::sample::select(VOCAB),
    ) {
        let index = build(&docs, WeightScheme::Frequency);
        let retrieval = build_retrieval(ScoringAlgorithm::WordCount, &index, &SimpleTokenizer);
        let text = query.join(" ");
        let before = retrieval.retrieve(1, &text);
        let after = retrieval.retrieve(1, &format!("{} {}", text, extra));
        for (doc, score) in before.scores() {
            prop_assert!(after.score(*doc).unwrap_or(0.0) >= *score);
        }
    }

    #[test]
    fn per_query_measures_stay_in_unit_range(
        retrieved in prop::collection::hash_set(1u32..30, 0..20),
        relevant in prop::collection::hash_map(1u32..30, 1i32..5, 0..10),
    ) {
        let retrieved: Vec<DocId> = retrieved.into_iter().collect();
        let relevant: HashMap<DocId, i32> = relevant;
        let m = QueryMetrics::compute(1, &retrieved, &relevant, Duration::ZERO);
        for v in [m.precision, m.recall, m.fmeasure, m.average_precision, m.average_precision_at_10, m.reciprocal_rank] {
            prop_assert!((0.0..=1.0).contains(&v));
        }
        prop_assert!(m.dcg >= 0.0);
        prop_assert!(m.average_precision_at_10 <= 1.0);
        prop_assert_eq!(average_precision(&retrieved, &relevant).1.len(), m.true_positives);
        if m.true_positives > 0 {
            prop_assert!(reciprocal_rank(&retrieved, &relevant) > 0.0);
        }
    }

    #[test]
    fn map_and_mrr_stay_in_unit_range(
        runs in prop::collection::vec(prop::collection::vec(1u32..20, 0..10), 1..8),
        judged in prop::collection::vec((1u32..8, 1u32..20, 1i32..5), 0..30),
    ) {
        let mut judgments = RelevanceJudgments::default();
        for (q, d, g) in judged {
            judgments.insert(q, d, g);
        }
        let mut eval = Evaluation::new(&judgments, 4);
        for (i, mut docs) in runs.into_iter().enumerate() {
            docs.sort_unstable();
            docs.dedup();
            eval.add_query(i as u32 + 1, &docs, Duration::from_micros(50));
        }
        let s = eval.summarize();
        prop_assert!((0.0..=1.0).contains(&s.map));
        prop_assert!((0.0..=1.0).contains(&s.map_at_10));
        prop_assert!((0.0..=1.0).contains(&s.mrr));
        prop_assert!(s.interpolated_precision.iter().all(|p| (0.0..=1.0).contains(p)));
    }
}
