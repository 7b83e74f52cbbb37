use super::*;

#[test]
fn register_assigns_fresh_id_and_appends() {
    let uploader = Uuid::new_v4();
    let mut reg = FileShareRegistry::new();
    let ev = reg.register("notes.pdf", "https://cdn.example/a", 2_097_152, uploader);

    assert_eq!(reg.files().len(), 1);
    assert_eq!(reg.files()[0].id, ev.id);
    assert_eq!(reg.files()[0].filename, "notes.pdf");
    assert_eq!(reg.files()[0].size, 2_097_152);
    assert_eq!(reg.files()[0].uploader_id, uploader);
}

#[test]
fn identical_filenames_get_distinct_ids() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let mut reg = FileShareRegistry::new();

    let first = reg.register("notes.pdf", "https://cdn.example/a", 2_097_152, a);
    let second = reg.register("notes.pdf", "https://cdn.example/b", 512, b);

    assert_ne!(first.id, second.id);
    assert_eq!(reg.files().len(), 2);
    assert!(reg.files().iter().all(|f| f.filename == "notes.pdf"));
}

#[test]
fn remote_entries_append_verbatim() {
    let mut reg = FileShareRegistry::new();
    let ev = FileSharedEvent {
        id: Uuid::new_v4(),
        filename: "slides.key".into(),
        url: "https://cdn.example/slides".into(),
        size: 42,
        uploader_id: Uuid::new_v4(),
        timestamp: 7,
    };
    assert!(reg.on_remote(&ev));
    assert_eq!(reg.files()[0].id, ev.id);
    assert_eq!(reg.files()[0].ts, 7);
}

#[test]
fn duplicate_remote_id_is_dropped() {
    let mut reg = FileShareRegistry::new();
    let ev = FileSharedEvent {
        id: Uuid::new_v4(),
        filename: "f".into(),
        url: "u".into(),
        size: 1,
        uploader_id: Uuid::new_v4(),
        timestamp: 0,
    };
    assert!(reg.on_remote(&ev));
    assert!(!reg.on_remote(&ev));
    assert_eq!(reg.files().len(), 1);
}

#[test]
fn own_echo_of_registered_file_is_dropped() {
    let mut reg = FileShareRegistry::new();
    let ev = reg.register("mine.txt", "https://cdn.example/mine", 10, Uuid::new_v4());
    assert!(!reg.on_remote(&ev));
    assert_eq!(reg.files().len(), 1);
}
