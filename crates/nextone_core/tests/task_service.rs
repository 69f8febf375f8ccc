use nextone_core::db::migrations::SCHEMA_VERSION;
use nextone_core::db::open_store_in_memory;
use nextone_core::scratch::{read_selection, SELECTION_KEY};
use nextone_core::{
    render_all, JsonFileScratchStore, MemoryScratchStore, ScratchStore, ServiceError,
    SqliteTaskRepository, Task, TaskRepository, TaskService, TaskStatus, TaskValidationError,
};
use serde_json::Value;

fn service() -> TaskService<SqliteTaskRepository> {
    TaskService::new(open_store_in_memory(SCHEMA_VERSION).unwrap())
}

#[test]
fn create_task_trims_text_and_defaults_to_pending() {
    let service = service();

    let created = service.create_task("  buy milk \n").unwrap();

    assert_eq!(created.text, "buy milk");
    assert_eq!(created.status, TaskStatus::Pending);
    assert!(created.id.is_some());
    assert_eq!(service.list_tasks().unwrap(), vec![created]);
}

#[test]
fn create_task_rejects_blank_text() {
    let service = service();

    let err = service.create_task("   ").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(TaskValidationError::EmptyText)
    ));
    assert!(service.list_tasks().unwrap().is_empty());
}

#[test]
fn toggle_and_set_status() {
    let service = service();
    service.repository().put(Task::with_id(1, "a")).unwrap();

    assert_eq!(service.toggle_task(1).unwrap().status, TaskStatus::Done);
    assert_eq!(
        service.set_task_status(1, TaskStatus::Done).unwrap().status,
        TaskStatus::Done
    );
    assert_eq!(
        service.set_task_status(1, TaskStatus::Pending).unwrap().status,
        TaskStatus::Pending
    );
}

#[test]
fn toggle_missing_task_reports_not_found() {
    let service = service();
    assert!(matches!(
        service.toggle_task(42),
        Err(ServiceError::TaskNotFound(42))
    ));
}

#[test]
fn delete_task_reports_whether_it_existed() {
    let service = service();
    service.repository().put(Task::with_id(1, "a")).unwrap();

    assert!(service.delete_task(1).unwrap());
    assert!(!service.delete_task(1).unwrap());
    assert!(service.get_task(1).unwrap().is_none());
}

#[test]
fn export_json_follows_listing_order() {
    let service = service();
    let repo = service.repository();
    repo.put(Task::with_id(1, "pending")).unwrap();
    repo.put(Task::with_id(2, "done").with_status(TaskStatus::Done))
        .unwrap();

    let exported: Value = serde_json::from_str(&service.export_json().unwrap()).unwrap();
    let ids: Vec<i64> = exported
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(exported[0]["status"], "done");
}

#[test]
fn select_task_writes_selection_to_scratch() {
    let service = service();
    service.repository().put(Task::with_id(7, "pick me")).unwrap();
    let mut scratch = MemoryScratchStore::new();

    service.select_task(&mut scratch, 7).unwrap();

    assert_eq!(scratch.get(SELECTION_KEY).as_deref(), Some("7"));
    assert_eq!(service.selected_task(&scratch), Some(7));
}

#[test]
fn select_missing_task_leaves_selection_untouched() {
    let service = service();
    let mut scratch = MemoryScratchStore::new();

    assert!(matches!(
        service.select_task(&mut scratch, 9),
        Err(ServiceError::TaskNotFound(9))
    ));
    assert_eq!(read_selection(&scratch), None);
}

#[test]
fn stale_selection_after_delete_is_tolerated() {
    let service = service();
    service.repository().put(Task::with_id(1, "a")).unwrap();
    service.repository().put(Task::with_id(2, "b")).unwrap();
    let mut scratch = MemoryScratchStore::new();
    service.select_task(&mut scratch, 1).unwrap();

    service.delete_task(1).unwrap();

    assert_eq!(service.selected_task(&scratch), Some(1));
    let rendered = render_all(service.repository(), &scratch).unwrap();
    assert!(!rendered.text.contains('>'));
    assert_eq!(rendered.count, 1);
}

#[test]
fn render_all_marks_selected_task_in_listing_order() {
    let dir = tempfile::tempdir().unwrap();
    let service = service();
    let repo = service.repository();
    repo.put(Task::with_id(1_000, "pending")).unwrap();
    repo.put(Task::with_id(2_000, "done").with_status(TaskStatus::Done))
        .unwrap();

    let mut scratch = JsonFileScratchStore::open(dir.path().join("scratch.json"));
    service.select_task(&mut scratch, 1_000).unwrap();

    let rendered = render_all(repo, &scratch).unwrap();
    assert_eq!(rendered.count, 2);
    let lines: Vec<&str> = rendered.text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "  2000 1970-01-01 [done] done",
            "> 1000 1970-01-01 [pending] pending",
        ]
    );
}

#[test]
fn render_all_keeps_one_line_per_task_for_multiline_text() {
    let service = service();
    service
        .repository()
        .put(Task::with_id(1, "line one\nline two"))
        .unwrap();
    service.repository().put(Task::with_id(2, "single")).unwrap();

    let rendered = render_all(service.repository(), &MemoryScratchStore::new()).unwrap();

    assert_eq!(rendered.count, 2);
    assert_eq!(rendered.text.lines().count(), rendered.count);
    assert!(rendered.text.contains("[pending] line one line two\n"));
}

#[test]
fn add_and_remove_tags() {
    let service = service();
    service.repository().put(Task::with_id(1, "a")).unwrap();

    service.add_tag(1, " home ").unwrap();
    let tagged = service.add_tag(1, "work").unwrap();
    assert_eq!(tagged.tags, vec!["home", "work"]);
    assert_eq!(service.add_tag(1, "home").unwrap().tags, vec!["home", "work"]);

    let untagged = service.remove_tag(1, "home").unwrap();
    assert_eq!(untagged.tags, vec!["work"]);
    assert_eq!(service.get_task(1).unwrap().unwrap().tags, vec!["work"]);
}

#[test]
fn add_tag_rejects_blank_and_multi_word_tags() {
    let service = service();
    service.repository().put(Task::with_id(1, "a")).unwrap();

    assert!(matches!(
        service.add_tag(1, "  "),
        Err(ServiceError::Validation(TaskValidationError::EmptyTag))
    ));
    assert!(matches!(
        service.add_tag(1, "two words"),
        Err(ServiceError::Validation(TaskValidationError::InvalidTag(_)))
    ));
    assert!(service.get_task(1).unwrap().unwrap().tags.is_empty());
}

#[test]
fn tagging_missing_task_reports_not_found() {
    let service = service();
    assert!(matches!(
        service.add_tag(5, "home"),
        Err(ServiceError::TaskNotFound(5))
    ));
    assert!(matches!(
        service.remove_tag(5, "home"),
        Err(ServiceError::TaskNotFound(5))
    ));
}
