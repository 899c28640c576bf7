//! Property tests for registry invariants.

use std::collections::BTreeSet;
use std::io::Cursor;

use proptest::prelude::*;

use ipfc::lexer::TagId;
use ipfc::registry::{GlobalDictionary, NameMap, ResourceMap, Synonym, SynonymTable};
use ipfc::{CompileOptions, Error, FileOpener, TokenKind, VecSource, compile};

fn word() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9]{0,11}"
}

proptest! {
    #[test]
    fn resource_map_rejects_second_insert(keys in prop::collection::vec(any::<u16>(), 1..64)) {
        let mut map = ResourceMap::new();
        let mut seen = BTreeSet::new();
        for (toc, key) in keys.iter().enumerate() {
            let result = map.insert(*key, toc as u16);
            if seen.insert(*key) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(matches!(result, Err(Error::DuplicateResource(k)) if k == *key));
            }
        }
        prop_assert_eq!(map.len(), seen.len());
    }

    #[test]
    fn name_map_rejects_second_insert(names in prop::collection::vec(word(), 1..64)) {
        let mut map = NameMap::new();
        let mut seen = BTreeSet::new();
        for (toc, name) in names.iter().enumerate() {
            let result = map.insert(name, toc as u16);
            prop_assert_eq!(result.is_ok(), seen.insert(name.clone()));
        }
    }

    #[test]
    fn synonym_table_rejects_second_insert(keys in prop::collection::vec(word(), 1..64)) {
        let mut table = SynonymTable::new();
        let mut seen = BTreeSet::new();
        for key in &keys {
            let result = table.insert(key, Synonym::new(vec![key.clone()]));
            prop_assert_eq!(result.is_ok(), seen.insert(key.clone()));
        }
        prop_assert_eq!(table.len(), seen.len());
    }

    #[test]
    fn dictionary_ids_are_a_permutation(words in prop::collection::vec(word(), 1..200)) {
        let mut dict = GlobalDictionary::new();
        for w in &words {
            dict.insert(w);
        }
        dict.convert().unwrap();

        let n = dict.size();
        let ids: BTreeSet<u16> = words.iter().map(|w| dict.id_of(w).unwrap()).collect();
        prop_assert_eq!(ids.len(), n);
        prop_assert_eq!(ids.iter().next().copied(), Some(0));
        prop_assert_eq!(ids.iter().last().copied(), Some((n - 1) as u16));
    }

    #[test]
    fn numbering_is_idempotent(words in prop::collection::vec(word(), 1..100)) {
        let mut dict = GlobalDictionary::new();
        for w in &words {
            dict.insert(w);
        }
        dict.convert().unwrap();
        let first: Vec<u16> = words.iter().map(|w| dict.id_of(w).unwrap()).collect();
        dict.convert().unwrap();
        let second: Vec<u16> = words.iter().map(|w| dict.id_of(w).unwrap()).collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn pages_keep_root_order(titles in prop::collection::vec(word(), 1..20)) {
        let mut tokens = vec![TokenKind::tag(TagId::Userdoc)];
        for title in &titles {
            tokens.push(TokenKind::tag(TagId::Heading(1)));
            tokens.push(TokenKind::text(title.as_str()));
            tokens.push(TokenKind::newline());
        }
        tokens.push(TokenKind::tag(TagId::Euserdoc));

        let mut out = Cursor::new(Vec::new());
        let doc = compile(
            Box::new(VecSource::new("p.ipf", tokens)),
            &FileOpener,
            CompileOptions::default(),
            &mut out,
        )
        .unwrap();
        let got: Vec<&str> = doc.pages().iter().map(|p| p.title()).collect();
        let want: Vec<&str> = titles.iter().map(String::as_str).collect();
        prop_assert_eq!(got, want);
    }
}
