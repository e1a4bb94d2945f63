use word_refresher::store::operations::auth_users::{AuthUser, AuthUserRepository};
use word_refresher::store::operations::learning_history::{
    InteractionKind, LearningHistoryRecord, LearningHistoryRepository,
};
use word_refresher::store::operations::words::WordRepository;
use word_refresher::store::seed::{seed_starter_words, starter_words};
use word_refresher::store::Store;

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("persist.sled");
    let path = path.to_str().expect("utf8 path");

    let record = LearningHistoryRecord::new("u1", "3", InteractionKind::WritingTest);
    let user = AuthUser::new("Saki", "Saki@Test.com", "hash".to_string());
    {
        let store = Store::open(path).expect("open");
        store.run_migrations().expect("migrate");
        assert_eq!(seed_starter_words(&store).expect("seed"), 10);
        assert!(store.create_history(&record).expect("history"));
        store.create_auth_user(&user).expect("user");
        store.flush().expect("flush");
    }

    let store = Store::open(path).expect("reopen");
    store.run_migrations().expect("migrate again");
    assert_eq!(seed_starter_words(&store).expect("seed skipped"), 0);

    let ids: Vec<String> = store.list_words().expect("words").into_iter().map(|w| w.id).collect();
    let expected: Vec<String> = starter_words().into_iter().map(|w| w.id).collect();
    assert_eq!(ids, expected);

    assert_eq!(store.list_history_by_user("u1").expect("history"), vec![record.clone()]);
    assert!(!store.create_history(&record).expect("dedup after reopen"));

    let loaded = store
        .get_auth_user_by_email("saki@test.com")
        .expect("lookup")
        .expect("user exists");
    assert_eq!(loaded.id, user.id);
}
