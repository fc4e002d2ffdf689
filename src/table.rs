use crate::error::ValidationError;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TopicId(pub usize);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StudentId(pub usize);

/// A topic row as supplied by the input collaborator, before validation.
#[derive(Clone, Debug, PartialEq)]
pub struct RawTopic {
    pub name: String,
    pub capacity: i64,
    pub minimum: i64,
}

impl RawTopic {
    pub fn new(name: impl Into<String>, capacity: i64) -> Self {
        Self {
            name: name.into(),
            capacity,
            minimum: 0,
        }
    }

    pub fn with_minimum(mut self, minimum: i64) -> Self {
        self.minimum = minimum;
        self
    }
}

/// One entry of a student's choice list.
#[derive(Clone, Debug, PartialEq)]
pub enum RawChoice {
    /// Ranked by its position in the list.
    Positional(String),
    Ranked { topic: String, rank: i64 },
}

/// A student row as supplied by the input collaborator, before validation.
#[derive(Clone, Debug, PartialEq)]
pub struct RawStudent {
    pub name: String,
    pub choices: Vec<RawChoice>,
    pub weight: Option<f64>,
}

impl RawStudent {
    /// A student whose choices are ranked in list order.
    pub fn ranked<I, S>(name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            choices: choices
                .into_iter()
                .map(|c| RawChoice::Positional(c.into()))
                .collect(),
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    pub capacity: u32,
    pub minimum: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Preference {
    pub topic: TopicId,
    pub rank: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    /// Sorted by rank, most preferred first.
    pub preferences: Vec<Preference>,
    pub weight: f64,
}

impl Student {
    pub fn rank_of(&self, topic: TopicId) -> Option<u32> {
        self.preferences
            .iter()
            .find(|p| p.topic == topic)
            .map(|p| p.rank)
    }
}

/// Validated students, topics and ranked preferences.
#[derive(Clone, Debug, PartialEq)]
pub struct PreferenceTable {
    topics: Vec<Topic>,
    students: Vec<Student>,
}

impl PreferenceTable {
    pub fn new(topics: Vec<RawTopic>, students: Vec<RawStudent>) -> Result<Self, ValidationError> {
        if topics.is_empty() {
            return Err(ValidationError::NoTopics);
        }

        let mut topic_ids = BTreeMap::new();
        let mut validated_topics = Vec::with_capacity(topics.len());
        for (i, raw) in topics.into_iter().enumerate() {
            let topic = validate_topic(TopicId(i), raw)?;
            if topic_ids.insert(topic.name.clone(), topic.id).is_some() {
                return Err(ValidationError::DuplicateTopicName { topic: topic.name });
            }
            validated_topics.push(topic);
        }

        let mut seen_students = BTreeSet::new();
        let mut validated_students = Vec::with_capacity(students.len());
        for (i, raw) in students.into_iter().enumerate() {
            if !seen_students.insert(raw.name.clone()) {
                return Err(ValidationError::DuplicateStudent { student: raw.name });
            }
            validated_students.push(validate_student(StudentId(i), raw, &topic_ids)?);
        }

        Ok(Self {
            topics: validated_topics,
            students: validated_students,
        })
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn topic(&self, id: TopicId) -> &Topic {
        &self.topics[id.0]
    }

    pub fn student(&self, id: StudentId) -> &Student {
        &self.students[id.0]
    }

    pub fn total_capacity(&self) -> u64 {
        self.topics.iter().map(|t| u64::from(t.capacity)).sum()
    }

    /// Every rank some student uses, ascending.
    pub fn ranks_in_use(&self) -> BTreeSet<u32> {
        self.students
            .iter()
            .flat_map(|s| s.preferences.iter().map(|p| p.rank))
            .collect()
    }

    /// Highest rank any student uses, or 0 if nobody ranked anything.
    pub fn max_rank(&self) -> u32 {
        self.students
            .iter()
            .filter_map(|s| s.preferences.last())
            .map(|p| p.rank)
            .max()
            .unwrap_or(0)
    }
}

fn validate_topic(id: TopicId, raw: RawTopic) -> Result<Topic, ValidationError> {
    let capacity = u32::try_from(raw.capacity)
        .ok()
        .filter(|&c| c > 0)
        .ok_or_else(|| ValidationError::NonPositiveCapacity {
            topic: raw.name.clone(),
            capacity: raw.capacity,
        })?;

    let minimum = u32::try_from(raw.minimum)
        .ok()
        .filter(|&m| m <= capacity)
        .ok_or_else(|| ValidationError::InvalidMinimum {
            topic: raw.name.clone(),
            minimum: raw.minimum,
            capacity,
        })?;

    Ok(Topic {
        id,
        name: raw.name,
        capacity,
        minimum,
    })
}

fn validate_student(
    id: StudentId,
    raw: RawStudent,
    topic_ids: &BTreeMap<String, TopicId>,
) -> Result<Student, ValidationError> {
    let weight = raw.weight.unwrap_or(1.0);
    if !weight.is_finite() || weight <= 0.0 {
        return Err(ValidationError::InvalidWeight {
            student: raw.name,
            weight,
        });
    }

    let mut preferences: Vec<Preference> = Vec::with_capacity(raw.choices.len());
    for (position, choice) in raw.choices.into_iter().enumerate() {
        let (topic_name, rank) = match choice {
            RawChoice::Positional(topic) => (topic, position as i64 + 1),
            RawChoice::Ranked { topic, rank } => (topic, rank),
        };

        let Some(&topic) = topic_ids.get(&topic_name) else {
            return Err(ValidationError::UnknownTopic {
                student: raw.name,
                topic: topic_name,
            });
        };
        let Some(rank) = u32::try_from(rank).ok().filter(|&r| r > 0) else {
            return Err(ValidationError::NonPositiveRank {
                student: raw.name,
                topic: topic_name,
                rank,
            });
        };
        if preferences.iter().any(|p| p.topic == topic) {
            return Err(ValidationError::DuplicateTopic {
                student: raw.name,
                topic: topic_name,
            });
        }
        if preferences.iter().any(|p| p.rank == rank) {
            return Err(ValidationError::DuplicateRank {
                student: raw.name,
                rank,
            });
        }

        preferences.push(Preference { topic, rank });
    }
    preferences.sort_by_key(|p| p.rank);

    Ok(Student {
        id,
        name: raw.name,
        preferences,
        weight,
    })
}
