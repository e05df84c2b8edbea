//! The per-entity collection handles injected into every manager.

use std::sync::Arc;

use crate::store::{Collection, InMemoryCollection};

#[derive(Clone)]
pub struct Collections {
    pub users: Arc<dyn Collection>,
    pub schools: Arc<dyn Collection>,
    pub classrooms: Arc<dyn Collection>,
    pub students: Arc<dyn Collection>,
}

impl Collections {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryCollection::new("users")),
            schools: Arc::new(InMemoryCollection::new("schools")),
            classrooms: Arc::new(InMemoryCollection::new("classrooms")),
            students: Arc::new(InMemoryCollection::new("students")),
        }
    }
}

impl core::fmt::Debug for Collections {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collections")
            .field("users", &self.users.name())
            .field("schools", &self.schools.name())
            .field("classrooms", &self.classrooms.name())
            .field("students", &self.students.name())
            .finish()
    }
}
