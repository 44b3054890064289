use crate::db::SchoolRepository;
use crate::error::{EntityKind, Result};
use crate::models::{Course, Instructor, Student};

/// The three top-level tabs, in display order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Tab {
    Students,
    Instructors,
    Courses,
}

impl Tab {
    pub(crate) const ALL: [Tab; 3] = [Tab::Students, Tab::Instructors, Tab::Courses];

    pub(crate) fn title(self) -> &'static str {
        match self {
            Tab::Students => "Students",
            Tab::Instructors => "Instructors",
            Tab::Courses => "Courses",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Tab::Students => 0,
            Tab::Instructors => 1,
            Tab::Courses => 2,
        }
    }

    pub(crate) fn kind(self) -> EntityKind {
        match self {
            Tab::Students => EntityKind::Student,
            Tab::Instructors => EntityKind::Instructor,
            Tab::Courses => EntityKind::Course,
        }
    }

    pub(crate) fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub(crate) fn prev(self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

/// Rows currently shown in each tab plus the per-tab selection. Rows come from
/// `SchoolRepository::search`, so an active filter and the unfiltered view
/// share one loading path.
#[derive(Default)]
pub(crate) struct Listing {
    pub(crate) students: Vec<Student>,
    pub(crate) instructors: Vec<Instructor>,
    pub(crate) courses: Vec<Course>,
    pub(crate) filter: Option<String>,
    selected: [usize; 3],
}

impl Listing {
    pub(crate) fn reload(&mut self, repo: &dyn SchoolRepository) -> Result<()> {
        let results = repo.search(self.filter.as_deref().unwrap_or(""))?;
        self.students = results.students;
        self.instructors = results.instructors;
        self.courses = results.courses;
        for tab in Tab::ALL {
            self.ensure_in_bounds(tab);
        }
        Ok(())
    }

    pub(crate) fn set_filter(&mut self, filter: Option<String>) {
        self.filter = filter.filter(|q| !q.trim().is_empty());
        self.selected = [0; 3];
    }

    pub(crate) fn len(&self, tab: Tab) -> usize {
        match tab {
            Tab::Students => self.students.len(),
            Tab::Instructors => self.instructors.len(),
            Tab::Courses => self.courses.len(),
        }
    }

    pub(crate) fn selected(&self, tab: Tab) -> usize {
        self.selected[tab.index()]
    }

    pub(crate) fn move_selection(&mut self, tab: Tab, offset: isize) {
        let len = self.len(tab);
        if len == 0 {
            return;
        }
        let current = self.selected[tab.index()] as isize;
        self.selected[tab.index()] = (current + offset).clamp(0, len as isize - 1) as usize;
    }

    pub(crate) fn select_first(&mut self, tab: Tab) {
        self.selected[tab.index()] = 0;
    }

    pub(crate) fn select_last(&mut self, tab: Tab) {
        self.selected[tab.index()] = self.len(tab).saturating_sub(1);
    }

    /// Move the selection onto the row with `id`, if it is visible.
    pub(crate) fn focus(&mut self, tab: Tab, id: &str) {
        let position = match tab {
            Tab::Students => self.students.iter().position(|s| s.id == id),
            Tab::Instructors => self.instructors.iter().position(|i| i.id == id),
            Tab::Courses => self.courses.iter().position(|c| c.id == id),
        };
        if let Some(index) = position {
            self.selected[tab.index()] = index;
        }
    }

    fn ensure_in_bounds(&mut self, tab: Tab) {
        let len = self.len(tab);
        let slot = &mut self.selected[tab.index()];
        if len == 0 {
            *slot = 0;
        } else if *slot >= len {
            *slot = len - 1;
        }
    }

    pub(crate) fn current_student(&self) -> Option<&Student> {
        self.students.get(self.selected(Tab::Students))
    }

    pub(crate) fn current_instructor(&self) -> Option<&Instructor> {
        self.instructors.get(self.selected(Tab::Instructors))
    }

    pub(crate) fn current_course(&self) -> Option<&Course> {
        self.courses.get(self.selected(Tab::Courses))
    }

    /// Id and display label of the selected row in `tab`.
    pub(crate) fn current_label(&self, tab: Tab) -> Option<(String, String)> {
        match tab {
            Tab::Students => self.current_student().map(|s| (s.id.clone(), s.to_string())),
            Tab::Instructors => self
                .current_instructor()
                .map(|i| (i.id.clone(), i.to_string())),
            Tab::Courses => self.current_course().map(|c| (c.id.clone(), c.to_string())),
        }
    }
}
