use chrono::{Duration, TimeZone, Utc};
use notestore_core::{
    BlobNoteRepository, BlobStore, FixedClock, MemoryBlobStore, Note, NoteDraft, NoteRepository,
    NoteService, NoteServiceError, OpContext, RepoError,
};

fn ctx() -> OpContext {
    OpContext::background()
}

fn service_at(
    start: chrono::DateTime<Utc>,
) -> NoteService<BlobNoteRepository<MemoryBlobStore>, FixedClock> {
    NoteService::new(
        BlobNoteRepository::new(MemoryBlobStore::new()),
        FixedClock::new(start),
    )
}

fn start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
}

#[test]
fn save_then_get_returns_note_with_equal_timestamps() {
    let service = service_at(start());
    service
        .create(&ctx(), NoteDraft::with_id("1", "T", "D"))
        .unwrap();

    let loaded = service.get(&ctx(), "1").unwrap();
    assert_eq!(loaded.id, "1");
    assert_eq!(loaded.title, "T");
    assert_eq!(loaded.data, "D");
    assert_eq!(loaded.created, start());
    assert_eq!(loaded.created, loaded.updated);

    let listed = service.list(&ctx(), 0, 0).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "1");
    assert_eq!(listed[0].title, "T");
    assert_eq!(listed[0].created, loaded.created);
    assert_eq!(listed[0].updated, loaded.updated);
}

#[test]
fn resave_keeps_created_and_position_and_refreshes_updated() {
    let clock = FixedClock::new(start());
    let service = NoteService::new(BlobNoteRepository::new(MemoryBlobStore::new()), &clock);
    service
        .create(&ctx(), NoteDraft::with_id("1", "T", "D"))
        .unwrap();
    service
        .create(&ctx(), NoteDraft::with_id("2", "other", "x"))
        .unwrap();

    clock.advance(Duration::minutes(10));
    service
        .create(&ctx(), NoteDraft::with_id("1", "T2", "D2"))
        .unwrap();

    let loaded = service.get(&ctx(), "1").unwrap();
    assert_eq!(loaded.data, "D2");
    assert_eq!(loaded.created, start());
    assert_eq!(loaded.updated, start() + Duration::minutes(10));

    let listed = service.list(&ctx(), 0, 0).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, "1");
    assert_eq!(listed[0].title, "T2");
    assert_eq!(listed[0].created, start());
    assert_ne!(listed[0].updated, listed[0].created);
    assert_eq!(listed[1].id, "2");
}

#[test]
fn delete_removes_blob_and_index_entry() {
    let service = service_at(start());
    service
        .create(&ctx(), NoteDraft::with_id("1", "T", "D"))
        .unwrap();

    service.delete(&ctx(), "1").unwrap();

    assert!(service.list(&ctx(), 0, 0).unwrap().is_empty());
    let err = service.get(&ctx(), "1").unwrap_err();
    assert!(matches!(err, NoteServiceError::NoteNotFound(ref id) if id == "1"));
}

#[test]
fn recreate_after_delete_starts_fresh_lifecycle() {
    let clock = FixedClock::new(start());
    let service = NoteService::new(BlobNoteRepository::new(MemoryBlobStore::new()), &clock);
    service
        .create(&ctx(), NoteDraft::with_id("1", "T", "D"))
        .unwrap();
    service.delete(&ctx(), "1").unwrap();

    clock.advance(Duration::hours(1));
    let recreated = service
        .create(&ctx(), NoteDraft::with_id("1", "T", "D"))
        .unwrap();
    assert_eq!(recreated.created, start() + Duration::hours(1));
}

#[test]
fn delete_of_unknown_id_is_a_noop() {
    let repo = BlobNoteRepository::new(MemoryBlobStore::new());
    let note = Note::new("1", "T", "D", start());
    repo.save(&ctx(), &note).unwrap();
    let before = repo.list(&ctx(), 0, 0).unwrap();

    repo.delete(&ctx(), "never-saved").unwrap();

    assert_eq!(repo.list(&ctx(), 0, 0).unwrap(), before);
}

#[test]
fn list_without_index_is_empty() {
    let repo = BlobNoteRepository::new(MemoryBlobStore::new());
    assert!(repo.list(&ctx(), 0, 0).unwrap().is_empty());
    assert!(repo.store().is_empty().unwrap());
}

#[test]
fn list_keeps_insertion_order_and_ignores_bounds() {
    let repo = BlobNoteRepository::new(MemoryBlobStore::new());
    repo.save(&ctx(), &Note::new("1", "a", "x", start())).unwrap();
    repo.save(&ctx(), &Note::new("2", "b", "y", start())).unwrap();
    repo.save(&ctx(), &Note::new("0", "c", "z", start())).unwrap();

    let ids: Vec<String> = repo
        .list(&ctx(), 1, 2)
        .unwrap()
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    assert_eq!(ids, vec!["1", "2", "0"]);
}

#[test]
fn get_missing_note_is_not_found() {
    let repo = BlobNoteRepository::new(MemoryBlobStore::new());
    let err = repo.get(&ctx(), "missing").unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, RepoError::NotFound(ref id) if id == "missing"));
}

#[test]
fn repository_save_does_not_touch_timestamps() {
    let repo = BlobNoteRepository::new(MemoryBlobStore::new());
    let mut note = Note::new("1", "T", "D", start());
    note.updated = start() + Duration::days(2);
    repo.save(&ctx(), &note).unwrap();

    assert_eq!(repo.get(&ctx(), "1").unwrap(), note);
}

#[test]
fn service_rejects_invalid_drafts_before_touching_the_store() {
    let service = service_at(start());

    for draft in [
        NoteDraft::with_id("", "T", "D"),
        NoteDraft::with_id("   ", "T", "D"),
        NoteDraft::with_id("index", "T", "D"),
        NoteDraft::with_id("1", "T", ""),
    ] {
        let err = service.create(&ctx(), draft).unwrap_err();
        assert!(matches!(err, NoteServiceError::InvalidNote(_)));
    }
    assert!(service.repository().store().is_empty().unwrap());
}

#[test]
fn service_with_custom_index_key_reserves_that_key() {
    let service = NoteService::with_index_key(
        BlobNoteRepository::with_index(MemoryBlobStore::new(), "_idx", Default::default()),
        FixedClock::new(start()),
        "_idx",
    );
    assert!(service
        .create(&ctx(), NoteDraft::with_id("_idx", "T", "D"))
        .is_err());
    service
        .create(&ctx(), NoteDraft::with_id("index", "T", "D"))
        .unwrap();
    assert_eq!(service.list(&ctx(), 0, 0).unwrap().len(), 1);
}

#[test]
fn generated_draft_id_round_trips() {
    let service = service_at(start());
    let saved = service
        .create(&ctx(), NoteDraft::new("title", "body"))
        .unwrap();
    assert_eq!(service.get(&ctx(), &saved.id).unwrap(), saved);
}

#[test]
fn create_overwrites_an_unreadable_blob_as_a_new_note() {
    let clock = FixedClock::new(start());
    let service = NoteService::new(BlobNoteRepository::new(MemoryBlobStore::new()), &clock);
    service.repository().store().put("1", b"garbage").unwrap();
    assert!(matches!(
        service.get(&ctx(), "1").unwrap_err(),
        NoteServiceError::Repo(RepoError::Encoding { .. })
    ));

    clock.advance(Duration::minutes(5));
    let saved = service
        .create(&ctx(), NoteDraft::with_id("1", "T", "D"))
        .unwrap();

    assert_eq!(saved.created, start() + Duration::minutes(5));
    assert_eq!(saved.created, saved.updated);
    assert_eq!(service.get(&ctx(), "1").unwrap(), saved);
    assert_eq!(service.list(&ctx(), 0, 0).unwrap().len(), 1);
}
