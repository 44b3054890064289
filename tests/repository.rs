use school_manager::{
    CoursePatch, EntityKind, NewCourse, NewPerson, PersonPatch, SchoolError, SchoolRepository,
    SqliteStore,
};

fn store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

fn student(id: &str) -> NewPerson {
    NewPerson::new(id, format!("Student {id}"), 20, format!("{}@uni.edu", id.to_lowercase()))
}

fn instructor(id: &str) -> NewPerson {
    NewPerson::new(id, format!("Instructor {id}"), 45, format!("{}@uni.edu", id.to_lowercase()))
}

#[test]
fn create_and_read_student_roundtrip() {
    let repo = store();
    let created = repo
        .create_student(&NewPerson::new("S1", "Ada Lovelace", 20, "ada@uni.edu"))
        .unwrap();

    let loaded = repo.student("S1").unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.name, "Ada Lovelace");
    assert_eq!(loaded.age, 20);
    assert_eq!(loaded.email, "ada@uni.edu");
    assert!(loaded.courses.is_empty());
}

#[test]
fn delete_then_read_is_not_found() {
    let repo = store();
    repo.create_instructor(&instructor("I1")).unwrap();
    repo.delete_instructor("I1").unwrap();

    let err = repo.instructor("I1").unwrap_err();
    assert!(matches!(
        err,
        SchoolError::NotFound {
            kind: EntityKind::Instructor,
            ..
        }
    ));
    assert!(repo.delete_instructor("I1").unwrap_err().is_not_found());
}

#[test]
fn duplicate_ids_are_rejected() {
    let repo = store();
    repo.create_student(&student("S1")).unwrap();

    let err = repo.create_student(&student("S1")).unwrap_err();
    assert!(matches!(err, SchoolError::DuplicateIdentifier { .. }));

    // Ids are namespaced per entity kind.
    repo.create_instructor(&instructor("S1")).unwrap();
}

#[test]
fn invalid_fields_are_rejected() {
    let repo = store();
    let cases = [
        NewPerson::new("", "Ada", 20, "ada@uni.edu"),
        NewPerson::new("S 1", "Ada", 20, "ada@uni.edu"),
        NewPerson::new("S1", "   ", 20, "ada@uni.edu"),
        NewPerson::new("S1", "Ada", 151, "ada@uni.edu"),
        NewPerson::new("S1", "Ada", 20, "not-an-email"),
    ];
    for case in &cases {
        let err = repo.create_student(case).unwrap_err();
        assert!(
            matches!(err, SchoolError::Validation { .. }),
            "expected validation error for {case:?}, got {err:?}"
        );
    }
    assert!(repo.students().unwrap().is_empty());
}

#[test]
fn partial_update_keeps_other_fields() {
    let repo = store();
    repo.create_student(&NewPerson::new("S1", "Ada", 20, "ada@uni.edu"))
        .unwrap();

    let updated = repo
        .update_student(
            "S1",
            &PersonPatch {
                age: Some(21),
                ..PersonPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.age, 21);
    assert_eq!(updated.name, "Ada");
    assert_eq!(repo.student("S1").unwrap(), updated);

    let err = repo
        .update_student(
            "S1",
            &PersonPatch {
                email: Some("broken".into()),
                ..PersonPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, SchoolError::Validation { field: "email", .. }));
    assert_eq!(repo.student("S1").unwrap().email, "ada@uni.edu");
}

#[test]
fn update_missing_record_is_not_found() {
    let repo = store();
    let patch = PersonPatch {
        name: Some("Nobody".into()),
        ..PersonPatch::default()
    };
    assert!(repo.update_instructor("I9", &patch).unwrap_err().is_not_found());
    let course_patch = CoursePatch {
        name: Some("Nothing".into()),
    };
    assert!(repo.update_course("C9", &course_patch).unwrap_err().is_not_found());
}

#[test]
fn assigning_instructor_shows_on_both_sides() {
    let repo = store();
    repo.create_instructor(&NewPerson::new("I1", "Dr. Lee", 45, "lee@uni.edu"))
        .unwrap();
    repo.create_course(&NewCourse::new("C1", "Algorithms"))
        .unwrap();

    repo.assign_instructor("C1", "I1").unwrap();
    assert_eq!(repo.course("C1").unwrap().instructor.as_deref(), Some("I1"));
    assert_eq!(repo.instructor("I1").unwrap().courses, vec!["C1".to_string()]);

    repo.delete_instructor("I1").unwrap();
    let course = repo.course("C1").unwrap();
    assert_eq!(course.instructor, None);
    assert_eq!(course.name, "Algorithms");
}

#[test]
fn reassigning_moves_the_course() {
    let repo = store();
    repo.create_instructor(&instructor("I1")).unwrap();
    repo.create_instructor(&instructor("I2")).unwrap();
    repo.create_course(&NewCourse::new("C1", "Algorithms").with_instructor("I1"))
        .unwrap();

    repo.assign_instructor("C1", "I2").unwrap();
    assert!(repo.instructor("I1").unwrap().courses.is_empty());
    assert_eq!(repo.instructor("I2").unwrap().courses, vec!["C1".to_string()]);

    repo.clear_instructor("C1").unwrap();
    assert_eq!(repo.course("C1").unwrap().instructor, None);
}

#[test]
fn course_with_unknown_instructor_is_rejected() {
    let repo = store();
    let err = repo
        .create_course(&NewCourse::new("C1", "Algorithms").with_instructor("I9"))
        .unwrap_err();
    assert!(matches!(
        err,
        SchoolError::NotFound {
            kind: EntityKind::Instructor,
            ..
        }
    ));
    assert!(repo.courses().unwrap().is_empty());
}

#[test]
fn deleting_student_clears_every_roster() {
    let repo = store();
    repo.create_student(&student("S1")).unwrap();
    repo.create_course(&NewCourse::new("C1", "Algorithms"))
        .unwrap();
    repo.create_course(&NewCourse::new("C2", "Databases"))
        .unwrap();
    repo.enroll_student("C1", "S1").unwrap();
    repo.enroll_student("C2", "S1").unwrap();

    assert_eq!(
        repo.student("S1").unwrap().courses,
        vec!["C1".to_string(), "C2".to_string()]
    );
    assert_eq!(repo.course("C2").unwrap().students, vec!["S1".to_string()]);

    repo.delete_student("S1").unwrap();
    assert!(repo.course("C1").unwrap().students.is_empty());
    assert!(repo.course("C2").unwrap().students.is_empty());
}

#[test]
fn deleting_one_course_keeps_the_other_enrollment() {
    let repo = store();
    repo.create_student(&student("S1")).unwrap();
    repo.create_course(&NewCourse::new("C1", "Algorithms"))
        .unwrap();
    repo.create_course(&NewCourse::new("C2", "Databases"))
        .unwrap();
    repo.enroll_student("C1", "S1").unwrap();
    repo.enroll_student("C2", "S1").unwrap();

    repo.delete_course("C1").unwrap();
    assert_eq!(repo.student("S1").unwrap().courses, vec!["C2".to_string()]);
}

#[test]
fn deleting_course_drops_enrollments() {
    let repo = store();
    repo.create_student(&student("S1")).unwrap();
    repo.create_course(&NewCourse::new("C1", "Algorithms"))
        .unwrap();
    repo.enroll_student("C1", "S1").unwrap();

    repo.delete_course("C1").unwrap();
    assert!(repo.student("S1").unwrap().courses.is_empty());
}

#[test]
fn double_enrollment_is_idempotent() {
    let repo = store();
    repo.create_student(&student("S1")).unwrap();
    repo.create_course(&NewCourse::new("C1", "Algorithms"))
        .unwrap();

    repo.enroll_student("C1", "S1").unwrap();
    repo.enroll_student("C1", "S1").unwrap();

    assert_eq!(repo.course("C1").unwrap().students, vec!["S1".to_string()]);
    assert_eq!(repo.student("S1").unwrap().courses, vec!["C1".to_string()]);
}

#[test]
fn unenroll_removes_one_pair_only() {
    let repo = store();
    repo.create_student(&student("S1")).unwrap();
    repo.create_student(&student("S2")).unwrap();
    repo.create_course(&NewCourse::new("C1", "Algorithms"))
        .unwrap();
    repo.enroll_student("C1", "S1").unwrap();
    repo.enroll_student("C1", "S2").unwrap();

    repo.unenroll_student("C1", "S1").unwrap();
    assert_eq!(repo.course("C1").unwrap().students, vec!["S2".to_string()]);

    // A pair that was never enrolled is a no-op.
    repo.unenroll_student("C1", "S1").unwrap();
    assert!(repo.unenroll_student("C1", "S9").unwrap_err().is_not_found());
}

#[test]
fn enrollment_requires_both_records() {
    let repo = store();
    repo.create_student(&student("S1")).unwrap();
    let err = repo.enroll_student("C9", "S1").unwrap_err();
    assert!(matches!(
        err,
        SchoolError::NotFound {
            kind: EntityKind::Course,
            ..
        }
    ));

    repo.create_course(&NewCourse::new("C1", "Algorithms"))
        .unwrap();
    let err = repo.enroll_student("C1", "S9").unwrap_err();
    assert!(matches!(
        err,
        SchoolError::NotFound {
            kind: EntityKind::Student,
            ..
        }
    ));
}

#[test]
fn search_matches_ids_names_and_emails() {
    let repo = store();
    repo.create_student(&NewPerson::new("S1", "Ada Lovelace", 20, "ada@uni.edu"))
        .unwrap();
    repo.create_instructor(&NewPerson::new("I1", "Dr. Lee", 45, "lee@uni.edu"))
        .unwrap();
    repo.create_course(&NewCourse::new("C1", "Algorithms"))
        .unwrap();

    let results = repo.search("LOVE").unwrap();
    assert_eq!(results.students.len(), 1);
    assert_eq!(results.total(), 1);

    let results = repo.search("uni.edu").unwrap();
    assert_eq!(results.students.len(), 1);
    assert_eq!(results.instructors.len(), 1);
    assert!(results.courses.is_empty());

    assert_eq!(repo.search("c1").unwrap().courses.len(), 1);
    assert_eq!(repo.search("").unwrap().total(), 3);
    assert_eq!(repo.search("zzz").unwrap().total(), 0);
}

#[test]
fn search_folds_non_ascii_case() {
    let repo = store();
    repo.create_student(&NewPerson::new("S1", "Émile Zola", 30, "emile@uni.edu"))
        .unwrap();
    repo.create_instructor(&NewPerson::new("I1", "Ørsted", 50, "oersted@uni.edu"))
        .unwrap();

    assert_eq!(repo.search("Émile").unwrap().students.len(), 1);
    assert_eq!(repo.search("éMILE").unwrap().students.len(), 1);
    assert_eq!(repo.search("ZOLA").unwrap().students.len(), 1);
    assert_eq!(repo.search("øRS").unwrap().instructors.len(), 1);
}

#[test]
fn counts_and_clear_all() {
    let repo = store();
    repo.create_student(&student("S1")).unwrap();
    repo.create_instructor(&instructor("I1")).unwrap();
    repo.create_course(&NewCourse::new("C1", "Algorithms").with_instructor("I1"))
        .unwrap();
    repo.enroll_student("C1", "S1").unwrap();

    let counts = repo.counts().unwrap();
    assert_eq!((counts.students, counts.instructors, counts.courses), (1, 1, 1));

    repo.clear_all().unwrap();
    let counts = repo.counts().unwrap();
    assert_eq!((counts.students, counts.instructors, counts.courses), (0, 0, 0));
}

#[test]
fn atomically_rolls_back_every_change() {
    let repo = store();
    let err = repo
        .atomically(&mut || {
            repo.create_student(&student("S1"))?;
            repo.create_student(&student("S1"))?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, SchoolError::DuplicateIdentifier { .. }));
    assert!(repo.students().unwrap().is_empty());
}

#[test]
fn data_survives_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("school.db");
    {
        let repo = SqliteStore::open(&path).unwrap();
        repo.create_student(&student("S1")).unwrap();
        repo.create_course(&NewCourse::new("C1", "Algorithms"))
            .unwrap();
        repo.enroll_student("C1", "S1").unwrap();
    }

    let repo = SqliteStore::open(&path).unwrap();
    assert_eq!(repo.path(), Some(path.as_path()));
    assert_eq!(repo.course("C1").unwrap().students, vec!["S1".to_string()]);
}
