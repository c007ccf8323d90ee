use std::collections::BTreeSet;
use wordspreader_core::{
    FieldUpdate, RepoError, RepoResult, Word, WordStore, WordUpdate, WordValidationError,
};

fn tag_set(tags: &[&str]) -> BTreeSet<String> {
    tags.iter().map(|tag| tag.to_string()).collect()
}

fn names(store: &WordStore, tag: Option<&str>) -> Vec<String> {
    store
        .list(tag)
        .map(|word| word.map(|word| word.name))
        .collect::<RepoResult<_>>()
        .unwrap()
}

#[test]
fn create_then_fetch_roundtrips_name_content_and_tags() {
    let mut store = WordStore::open_in_memory().unwrap();

    let created = store
        .create("Greeting ", "Hello,\nworld", ["Polite", "en", "Polite"])
        .unwrap();
    let fetched = store.fetch("Greeting ").unwrap().unwrap();

    assert_eq!(created, fetched);
    assert_eq!(fetched.name, "Greeting ");
    assert_eq!(fetched.content, "Hello,\nworld");
    assert_eq!(fetched.tags, tag_set(&["Polite", "en"]));
}

#[test]
fn create_with_no_tags_and_empty_content() {
    let mut store = WordStore::open_in_memory().unwrap();
    let created = store.create("bare", "", Vec::<String>::new()).unwrap();
    assert_eq!(created, Word::new("bare", "", Vec::<String>::new()));
    assert_eq!(store.all_tag_names().count(), 0);
}

#[test]
fn create_duplicate_name_fails_and_keeps_first_entry() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("a", "first", ["t1"]).unwrap();

    let err = store.create("a", "second", ["t2"]).unwrap_err();
    assert!(matches!(err, RepoError::DuplicateKey(ref name) if name == "a"));

    let word = store.fetch("a").unwrap().unwrap();
    assert_eq!(word.content, "first");
    assert_eq!(word.tags, tag_set(&["t1"]));
    // The failed create must not leave its new tag behind.
    let tags: Vec<String> = store.all_tag_names().collect::<RepoResult<_>>().unwrap();
    assert_eq!(tags, vec!["t1"]);
}

#[test]
fn create_rejects_empty_name_and_blank_tags() {
    let mut store = WordStore::open_in_memory().unwrap();

    let err = store.create("", "x", Vec::<String>::new()).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(WordValidationError::EmptyName)
    ));

    let err = store.create("a", "x", [" "]).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(WordValidationError::BlankTag(_))
    ));
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn blank_name_is_refused_on_input_not_by_schema() {
    let store = WordStore::open_in_memory().unwrap();
    store
        .repository()
        .connection()
        .execute("INSERT INTO words (name, content) VALUES ('', 'raw');", [])
        .unwrap();

    assert_eq!(store.count().unwrap(), 1);
    let err = store.fetch("").unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn fetch_missing_returns_none_and_is_idempotent() {
    let mut store = WordStore::open_in_memory().unwrap();
    assert_eq!(store.fetch("nothing").unwrap(), None);

    store.create("a", "hi", ["x", "y"]).unwrap();
    let first = store.fetch("a").unwrap();
    let second = store.fetch("a").unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn rename_to_own_name_is_duplicate_key() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("a", "hi", ["x"]).unwrap();

    let err = store.rename("a", "a").unwrap_err();
    assert!(matches!(err, RepoError::DuplicateKey(ref name) if name == "a"));
    assert!(store.fetch("a").unwrap().is_some());
}

#[test]
fn rename_moves_identity_and_keeps_content_and_tags() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("a", "hi", ["x"]).unwrap();

    store.rename("a", "b").unwrap();

    let renamed = store.fetch("b").unwrap().unwrap();
    assert_eq!(renamed.content, "hi");
    assert_eq!(renamed.tags, tag_set(&["x"]));
    assert_eq!(store.fetch("a").unwrap(), None);
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn rename_onto_other_existing_word_fails() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("a", "1", Vec::<String>::new()).unwrap();
    store.create("b", "2", Vec::<String>::new()).unwrap();

    let err = store.rename("a", "b").unwrap_err();
    assert!(matches!(err, RepoError::DuplicateKey(ref name) if name == "b"));
    assert_eq!(store.fetch("a").unwrap().unwrap().content, "1");
    assert_eq!(store.fetch("b").unwrap().unwrap().content, "2");
}

#[test]
fn rename_missing_word_is_not_found() {
    let mut store = WordStore::open_in_memory().unwrap();
    let err = store.rename("ghost", "b").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(ref name) if name == "ghost"));
}

#[test]
fn content_update_preserves_tags() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("a", "hi", ["x"]).unwrap();

    store.set_content("a", "bye").unwrap();

    let word = store.fetch("a").unwrap().unwrap();
    assert_eq!(word.content, "bye");
    assert_eq!(word.tags, tag_set(&["x"]));
}

#[test]
fn clear_differs_from_keep() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("a", "hi", ["x"]).unwrap();

    store
        .update(
            "a",
            WordUpdate {
                content: FieldUpdate::Clear,
                tags: FieldUpdate::Keep,
                new_name: None,
            },
        )
        .unwrap();
    let word = store.fetch("a").unwrap().unwrap();
    assert_eq!(word.content, "");
    assert_eq!(word.tags, tag_set(&["x"]));

    store
        .update(
            "a",
            WordUpdate {
                content: FieldUpdate::Set("back".to_string()),
                tags: FieldUpdate::Clear,
                new_name: None,
            },
        )
        .unwrap();
    let word = store.fetch("a").unwrap().unwrap();
    assert_eq!(word.content, "back");
    assert!(word.tags.is_empty());
}

#[test]
fn update_applies_fields_then_rename() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("a", "hi", ["x"]).unwrap();

    store
        .update(
            "a",
            WordUpdate {
                content: FieldUpdate::Set("bye".to_string()),
                tags: FieldUpdate::Set(tag_set(&["y"])),
                new_name: Some("b".to_string()),
            },
        )
        .unwrap();

    assert_eq!(store.fetch("a").unwrap(), None);
    assert_eq!(
        store.fetch("b").unwrap().unwrap(),
        Word::new("b", "bye", ["y"])
    );
}

#[test]
fn update_rename_collision_keeps_committed_content_change() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("a", "hi", Vec::<String>::new()).unwrap();
    store.create("b", "other", Vec::<String>::new()).unwrap();

    let err = store
        .update(
            "a",
            WordUpdate {
                content: FieldUpdate::Set("changed".to_string()),
                new_name: Some("b".to_string()),
                ..WordUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateKey(_)));

    assert_eq!(store.fetch("a").unwrap().unwrap().content, "changed");
    assert_eq!(store.fetch("b").unwrap().unwrap().content, "other");
}

#[test]
fn update_with_same_new_name_skips_rename() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("a", "hi", Vec::<String>::new()).unwrap();

    store
        .update(
            "a",
            WordUpdate {
                content: FieldUpdate::Set("bye".to_string()),
                new_name: Some("a".to_string()),
                ..WordUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(store.fetch("a").unwrap().unwrap().content, "bye");
}

#[test]
fn update_missing_word_is_not_found() {
    let mut store = WordStore::open_in_memory().unwrap();
    let err = store.set_content("ghost", "x").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));

    let err = store.update("ghost", WordUpdate::rename("b")).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}

#[test]
fn empty_update_is_a_no_op() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("a", "hi", ["x"]).unwrap();
    store.update("a", WordUpdate::default()).unwrap();
    assert_eq!(store.fetch("a").unwrap().unwrap(), Word::new("a", "hi", ["x"]));
}

#[test]
fn empty_update_on_missing_word_is_not_found() {
    let mut store = WordStore::open_in_memory().unwrap();

    let err = store.update("ghost", WordUpdate::default()).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(ref name) if name == "ghost"));

    let err = store.update("ghost", WordUpdate::rename("ghost")).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn delete_removes_word_and_missing_delete_is_not_found() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("a", "", ["p", "q"]).unwrap();

    store.delete("a").unwrap();
    assert_eq!(store.fetch("a").unwrap(), None);

    let err = store.delete("a").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(ref name) if name == "a"));
}

#[test]
fn list_without_filter_is_sorted_by_name() {
    let mut store = WordStore::open_in_memory().unwrap();
    for name in ["delta", "alpha", "charlie", "bravo"] {
        store.create(name, "", Vec::<String>::new()).unwrap();
    }

    assert_eq!(names(&store, None), vec!["alpha", "bravo", "charlie", "delta"]);
}

#[test]
fn list_filters_by_exact_tag() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("a", "", ["x"]).unwrap();
    store.create("b", "", ["y"]).unwrap();
    store.create("c", "", ["xx", "X"]).unwrap();

    assert_eq!(names(&store, Some("x")), vec!["a"]);
    assert_eq!(names(&store, Some("y")), vec!["b"]);
    assert!(names(&store, Some("missing")).is_empty());

    let listed: Vec<Word> = store
        .list(Some("x"))
        .collect::<RepoResult<_>>()
        .unwrap();
    assert_eq!(listed, vec![store.fetch("a").unwrap().unwrap()]);
}

#[test]
fn list_streams_across_many_pages() {
    let mut store = WordStore::open_in_memory().unwrap();
    for idx in 0..150 {
        let tags = if idx % 3 == 0 { vec!["third"] } else { vec![] };
        store.create(format!("word-{idx:03}"), "", tags).unwrap();
    }

    let all = names(&store, None);
    assert_eq!(all.len(), 150);
    assert_eq!(all.first().map(String::as_str), Some("word-000"));
    assert_eq!(all.last().map(String::as_str), Some("word-149"));
    assert_eq!(names(&store, Some("third")).len(), 50);

    let small_pages: Vec<Word> = store
        .repository()
        .word_cursor(None, 7)
        .collect::<RepoResult<_>>()
        .unwrap();
    assert_eq!(small_pages.len(), 150);

    let mut lazy = store.list(None);
    assert_eq!(lazy.next().unwrap().unwrap().name, "word-000");
    assert_eq!(lazy.next().unwrap().unwrap().name, "word-001");
}

#[test]
fn search_matches_like_patterns_on_names() {
    let mut store = WordStore::open_in_memory().unwrap();
    store.create("hello", "", Vec::<String>::new()).unwrap();
    store.create("help", "", Vec::<String>::new()).unwrap();
    store.create("world", "", Vec::<String>::new()).unwrap();

    let found: Vec<String> = store
        .search("hel%")
        .unwrap()
        .into_iter()
        .map(|word| word.name)
        .collect();
    assert_eq!(found, vec!["hello", "help"]);

    let single: Vec<String> = store
        .search("wor_d")
        .unwrap()
        .into_iter()
        .map(|word| word.name)
        .collect();
    assert_eq!(single, vec!["world"]);
}

#[test]
fn word_serializes_with_sorted_tags() {
    let word = Word::new("a", "hi", ["z", "b"]);
    let json = serde_json::to_value(&word).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "name": "a", "content": "hi", "tags": ["b", "z"] })
    );

    let parsed: Word = serde_json::from_str(r#"{"name":"a","content":"hi"}"#).unwrap();
    assert!(parsed.tags.is_empty());
}
