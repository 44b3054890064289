//! Command-line adapter. Every subcommand maps onto one repository,
//! snapshot or backup call and prints a short plain-text result.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};

use crate::backup::backup_to_folder;
use crate::config::Config;
use crate::db::SchoolRepository;
use crate::models::{Course, CoursePatch, Instructor, NewCourse, NewPerson, PersonPatch, Student};
use crate::snapshot::{export_snapshot, import_snapshot, read_snapshot, write_snapshot};

#[derive(Debug, Parser)]
#[command(name = "school-manager")]
#[command(about = "Manage students, instructors and courses", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ~/.school-manager/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding the configured one
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive interface (default)
    Tui,
    /// Student records
    #[command(subcommand)]
    Student(PersonCommand),
    /// Instructor records
    #[command(subcommand)]
    Instructor(PersonCommand),
    /// Courses, assignments and enrollments
    #[command(subcommand)]
    Course(CourseCommand),
    /// Case-insensitive search across ids, names and emails
    Search { query: String },
    /// Write a JSON snapshot of the whole store
    Export { path: Option<PathBuf> },
    /// Replace the store with a JSON snapshot
    Import { path: Option<PathBuf> },
    /// Copy the database file
    Backup {
        /// Exact destination instead of a timestamped file in the backup folder
        #[arg(long)]
        to: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum PersonCommand {
    List,
    Show { id: String },
    Add(AddPersonArgs),
    Update(UpdatePersonArgs),
    Delete { id: String },
}

#[derive(Debug, Args)]
pub struct AddPersonArgs {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub email: String,
}

#[derive(Debug, Args)]
pub struct UpdatePersonArgs {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub age: Option<u32>,
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum CourseCommand {
    List,
    Show {
        id: String,
    },
    Add {
        id: String,
        name: String,
        #[arg(long)]
        instructor: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: String,
    },
    Delete {
        id: String,
    },
    /// Make INSTRUCTOR the course's instructor
    Assign {
        course: String,
        instructor: String,
    },
    /// Leave the course without an instructor
    Unassign {
        course: String,
    },
    Enroll {
        course: String,
        student: String,
    },
    Unenroll {
        course: String,
        student: String,
    },
}

#[derive(Copy, Clone)]
enum Person {
    Student,
    Instructor,
}

/// Execute one non-interactive command. `Tui` is handled by the caller.
pub fn execute(
    command: Command,
    repo: &dyn SchoolRepository,
    config: &Config,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Tui => bail!("the tui command is handled by the binary"),
        Command::Student(cmd) => execute_person(Person::Student, cmd, repo, out),
        Command::Instructor(cmd) => execute_person(Person::Instructor, cmd, repo, out),
        Command::Course(cmd) => execute_course(cmd, repo, out),
        Command::Search { query } => {
            let results = repo.search(&query)?;
            if results.total() == 0 {
                writeln!(out, "no matches for \"{query}\"")?;
                return Ok(());
            }
            for student in &results.students {
                writeln!(out, "student     {}", student_line(student))?;
            }
            for instructor in &results.instructors {
                writeln!(out, "instructor  {}", instructor_line(instructor))?;
            }
            for course in &results.courses {
                writeln!(out, "course      {}", course_line(course))?;
            }
            Ok(())
        }
        Command::Export { path } => {
            let path = path.unwrap_or_else(|| config.snapshot_path.clone());
            let snapshot = export_snapshot(repo)?;
            write_snapshot(&path, &snapshot)?;
            writeln!(
                out,
                "exported {} students, {} instructors, {} courses to {}",
                snapshot.students.len(),
                snapshot.instructors.len(),
                snapshot.courses.len(),
                path.display()
            )?;
            Ok(())
        }
        Command::Import { path } => {
            let path = path.unwrap_or_else(|| config.snapshot_path.clone());
            let snapshot = read_snapshot(&path)?;
            import_snapshot(repo, &snapshot)
                .with_context(|| format!("failed to import {}", path.display()))?;
            writeln!(out, "imported {}", path.display())?;
            Ok(())
        }
        Command::Backup { to } => {
            let dest = match to {
                Some(dest) => {
                    repo.backup_to(&dest)?;
                    dest
                }
                None => backup_to_folder(repo, &config.backup_dir, &Local::now())?,
            };
            writeln!(out, "backed up to {}", dest.display())?;
            Ok(())
        }
    }
}

fn execute_person(
    person: Person,
    command: PersonCommand,
    repo: &dyn SchoolRepository,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        PersonCommand::List => {
            let lines: Vec<String> = match person {
                Person::Student => repo.students()?.iter().map(student_line).collect(),
                Person::Instructor => repo.instructors()?.iter().map(instructor_line).collect(),
            };
            for line in lines {
                writeln!(out, "{line}")?;
            }
        }
        PersonCommand::Show { id } => {
            let line = match person {
                Person::Student => student_line(&repo.student(&id)?),
                Person::Instructor => instructor_line(&repo.instructor(&id)?),
            };
            writeln!(out, "{line}")?;
        }
        PersonCommand::Add(args) => {
            let request = NewPerson::new(args.id, args.name, args.age, args.email);
            let line = match person {
                Person::Student => student_line(&repo.create_student(&request)?),
                Person::Instructor => instructor_line(&repo.create_instructor(&request)?),
            };
            writeln!(out, "added {line}")?;
        }
        PersonCommand::Update(args) => {
            let patch = PersonPatch {
                name: args.name,
                age: args.age,
                email: args.email,
            };
            if patch.is_empty() {
                bail!("nothing to update; pass --name, --age or --email");
            }
            let line = match person {
                Person::Student => student_line(&repo.update_student(&args.id, &patch)?),
                Person::Instructor => {
                    instructor_line(&repo.update_instructor(&args.id, &patch)?)
                }
            };
            writeln!(out, "updated {line}")?;
        }
        PersonCommand::Delete { id } => {
            match person {
                Person::Student => repo.delete_student(&id)?,
                Person::Instructor => repo.delete_instructor(&id)?,
            }
            writeln!(out, "deleted {id}")?;
        }
    }
    Ok(())
}

fn execute_course(
    command: CourseCommand,
    repo: &dyn SchoolRepository,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        CourseCommand::List => {
            for course in repo.courses()? {
                writeln!(out, "{}", course_line(&course))?;
            }
        }
        CourseCommand::Show { id } => writeln!(out, "{}", course_line(&repo.course(&id)?))?,
        CourseCommand::Add {
            id,
            name,
            instructor,
        } => {
            let mut request = NewCourse::new(id, name);
            if let Some(instructor) = instructor {
                request = request.with_instructor(instructor);
            }
            writeln!(out, "added {}", course_line(&repo.create_course(&request)?))?;
        }
        CourseCommand::Update { id, name } => {
            let patch = CoursePatch { name: Some(name) };
            writeln!(out, "updated {}", course_line(&repo.update_course(&id, &patch)?))?;
        }
        CourseCommand::Delete { id } => {
            repo.delete_course(&id)?;
            writeln!(out, "deleted {id}")?;
        }
        CourseCommand::Assign { course, instructor } => {
            repo.assign_instructor(&course, &instructor)?;
            writeln!(out, "{instructor} now teaches {course}")?;
        }
        CourseCommand::Unassign { course } => {
            repo.clear_instructor(&course)?;
            writeln!(out, "{course} has no instructor")?;
        }
        CourseCommand::Enroll { course, student } => {
            repo.enroll_student(&course, &student)?;
            writeln!(out, "{student} enrolled in {course}")?;
        }
        CourseCommand::Unenroll { course, student } => {
            repo.unenroll_student(&course, &student)?;
            writeln!(out, "{student} removed from {course}")?;
        }
    }
    Ok(())
}

fn student_line(student: &Student) -> String {
    format!(
        "{}\t{}\t{}\t{}\tcourses: {}",
        student.id,
        student.name,
        student.age,
        student.email,
        join_or_dash(&student.courses)
    )
}

fn instructor_line(instructor: &Instructor) -> String {
    format!(
        "{}\t{}\t{}\t{}\tteaches: {}",
        instructor.id,
        instructor.name,
        instructor.age,
        instructor.email,
        join_or_dash(&instructor.courses)
    )
}

fn course_line(course: &Course) -> String {
    format!(
        "{}\t{}\tinstructor: {}\tstudents: {}",
        course.id,
        course.name,
        course.instructor.as_deref().unwrap_or("-"),
        join_or_dash(&course.students)
    )
}

fn join_or_dash(ids: &[String]) -> String {
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.join(",")
    }
}
