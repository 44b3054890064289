use school_manager::snapshot::{read_snapshot, write_snapshot};
use school_manager::{
    export_snapshot, import_snapshot, NewCourse, NewPerson, SchoolError, SchoolRepository,
    Snapshot, SqliteStore,
};

const SAMPLE: &str = r#"{
    "students": [
        {
            "student_id": "S1",
            "name": "Ada",
            "age": 20,
            "email": "ada@uni.edu",
            "registered_courses": ["C1", "C2"]
        }
    ],
    "instructors": [
        {
            "instructor_id": "I1",
            "name": "Dr. Lee",
            "age": 45,
            "email": "lee@uni.edu",
            "assigned_courses": ["C1"]
        }
    ],
    "courses": [
        {
            "course_id": "C1",
            "course_name": "Algorithms",
            "instructor": "I1",
            "enrolled_students": ["S1"]
        },
        {
            "course_id": "C2",
            "course_name": "Databases",
            "instructor": null,
            "enrolled_students": ["S1"]
        }
    ]
}"#;

fn populated() -> SqliteStore {
    let repo = SqliteStore::open_in_memory().unwrap();
    repo.create_student(&NewPerson::new("S1", "Ada", 20, "ada@uni.edu"))
        .unwrap();
    repo.create_student(&NewPerson::new("S2", "Grace", 22, "grace@uni.edu"))
        .unwrap();
    repo.create_instructor(&NewPerson::new("I1", "Dr. Lee", 45, "lee@uni.edu"))
        .unwrap();
    repo.create_course(&NewCourse::new("C1", "Algorithms").with_instructor("I1"))
        .unwrap();
    repo.create_course(&NewCourse::new("C2", "Databases"))
        .unwrap();
    repo.enroll_student("C1", "S1").unwrap();
    repo.enroll_student("C2", "S1").unwrap();
    repo.enroll_student("C2", "S2").unwrap();
    repo
}

#[test]
fn import_of_export_leaves_state_unchanged() {
    let repo = populated();
    let before = export_snapshot(&repo).unwrap();

    import_snapshot(&repo, &before).unwrap();
    assert_eq!(export_snapshot(&repo).unwrap(), before);

    let other = SqliteStore::open_in_memory().unwrap();
    import_snapshot(&other, &before).unwrap();
    assert_eq!(export_snapshot(&other).unwrap(), before);
}

#[test]
fn export_lists_relationships_on_both_sides() {
    let snapshot = export_snapshot(&populated()).unwrap();

    let ada = &snapshot.students[0];
    assert_eq!(ada.student_id, "S1");
    assert_eq!(ada.registered_courses, vec!["C1", "C2"]);

    let lee = &snapshot.instructors[0];
    assert_eq!(lee.assigned_courses, vec!["C1"]);

    let databases = &snapshot.courses[1];
    assert_eq!(databases.instructor, None);
    assert_eq!(databases.enrolled_students, vec!["S1", "S2"]);
}

#[test]
fn import_replaces_existing_records() {
    let repo = populated();
    let snapshot = Snapshot::from_json(SAMPLE).unwrap();
    import_snapshot(&repo, &snapshot).unwrap();

    assert!(repo.student("S2").unwrap_err().is_not_found());
    assert_eq!(
        repo.student("S1").unwrap().courses,
        vec!["C1".to_string(), "C2".to_string()]
    );
    assert_eq!(repo.course("C1").unwrap().instructor.as_deref(), Some("I1"));
    assert_eq!(repo.instructor("I1").unwrap().courses, vec!["C1".to_string()]);
}

#[test]
fn malformed_json_is_rejected() {
    let cases = [
        "not json",
        r#"{"students": [], "instructors": []}"#,
        r#"{"students": [], "instructors": [], "courses": [], "extra": 1}"#,
        r#"{"students": [{"student_id": "S1"}], "instructors": [], "courses": []}"#,
    ];
    for case in cases {
        let err = Snapshot::from_json(case).unwrap_err();
        assert!(
            matches!(err, SchoolError::MalformedSnapshot(_)),
            "expected malformed snapshot for {case}"
        );
    }
}

#[test]
fn inconsistent_documents_fail_validation() {
    let unknown_student = SAMPLE.replace(r#""enrolled_students": ["S1"]"#, r#""enrolled_students": ["S9"]"#);
    let one_sided = SAMPLE.replace(r#""registered_courses": ["C1", "C2"]"#, r#""registered_courses": ["C1"]"#);
    let wrong_instructor = SAMPLE.replace(r#""assigned_courses": ["C1"]"#, r#""assigned_courses": ["C2"]"#);
    let bad_email = SAMPLE.replace("ada@uni.edu", "ada");

    for text in [unknown_student, one_sided, wrong_instructor, bad_email] {
        let snapshot = Snapshot::from_json(&text).unwrap();
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, SchoolError::MalformedSnapshot(_)), "{err}");
    }
}

#[test]
fn repeated_ids_in_a_list_are_rejected() {
    let repeated = [
        SAMPLE.replace(r#""registered_courses": ["C1", "C2"]"#, r#""registered_courses": ["C1", "C1", "C2"]"#),
        SAMPLE.replace(r#""assigned_courses": ["C1"]"#, r#""assigned_courses": ["C1", "C1"]"#),
        SAMPLE.replacen(r#""enrolled_students": ["S1"]"#, r#""enrolled_students": ["S1", "S1"]"#, 1),
    ];

    let repo = populated();
    let before = export_snapshot(&repo).unwrap();
    for text in repeated {
        let snapshot = Snapshot::from_json(&text).unwrap();
        let err = import_snapshot(&repo, &snapshot).unwrap_err();
        assert!(err.to_string().contains("twice"), "{err}");
        assert!(matches!(err, SchoolError::MalformedSnapshot(_)));
    }
    assert_eq!(export_snapshot(&repo).unwrap(), before);
}

#[test]
fn rejected_import_leaves_store_untouched() {
    let repo = populated();
    let before = export_snapshot(&repo).unwrap();

    let mut broken = Snapshot::from_json(SAMPLE).unwrap();
    broken.courses[0].instructor = Some("I9".into());
    let err = import_snapshot(&repo, &broken).unwrap_err();
    assert!(matches!(err, SchoolError::MalformedSnapshot(_)));

    assert_eq!(export_snapshot(&repo).unwrap(), before);
}

#[test]
fn snapshot_files_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exports").join("school.json");

    let snapshot = export_snapshot(&populated()).unwrap();
    write_snapshot(&path, &snapshot).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n    \"students\": ["));
    assert_eq!(read_snapshot(&path).unwrap(), snapshot);
}

#[test]
fn missing_snapshot_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_snapshot(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.is_io());
}

#[test]
fn empty_store_exports_empty_lists() {
    let snapshot = export_snapshot(&SqliteStore::open_in_memory().unwrap()).unwrap();
    assert_eq!(snapshot, Snapshot::default());
    assert_eq!(
        Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap(),
        snapshot
    );
}
