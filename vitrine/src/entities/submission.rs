use crate::collection::{Document, FindOptions, RecordId, Update, UpdateOptions, WriteResult};
use crate::common::{now, Convertible, Value, DOC_CREATED_AT, DOC_ID};
use crate::connection::Connection;
use crate::entities::tally;
use crate::errors::VitrineResult;
use crate::filter::{and, by_id, field, Filter};
use crate::query::{parse_sort, with_id_tiebreaker, FilterComposer, Paginated};
use crate::repository::{expect_document, put_optional, Entity, FieldRule, IdRef, Repository, Schema};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

const SUBMISSION_TYPE: &str = "submission_type";
const STATUS: &str = "status";
const NAME: &str = "name";
const EMAIL: &str = "email";
const PHONE: &str = "phone";
const COMPANY: &str = "company";
const SUBJECT: &str = "subject";
const MESSAGE: &str = "message";
const METADATA: &str = "metadata";
const READ_AT: &str = "read_at";

string_enum! {
    /// What an inbound form was submitted for.
    SubmissionType {
        Contact => "contact",
        Quote => "quote",
        Newsletter => "newsletter",
        Support => "support",
    }
}

string_enum! {
    /// Triage state of a submission. It only moves forward: new, read, archived.
    SubmissionStatus {
        New => "new",
        Read => "read",
        Archived => "archived",
    }
}

/// An inbound contact, quote, newsletter or support form.
///
/// Submissions are written once; afterwards only their status and `read_at`
/// change.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: Option<RecordId>,
    pub submission_type: SubmissionType,
    pub status: SubmissionStatus,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    /// Free-form request context such as `origin_address`.
    pub metadata: Document,
    pub created_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn new(submission_type: SubmissionType, name: &str, email: &str) -> Self {
        Submission {
            id: None,
            submission_type,
            status: SubmissionStatus::New,
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            company: None,
            subject: None,
            message: None,
            metadata: Document::new(),
            created_at: None,
            read_at: None,
        }
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }

    pub fn with_company(mut self, company: &str) -> Self {
        self.company = Some(company.to_string());
        self
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Records the address the form was posted from under `metadata.origin_address`.
    pub fn with_origin_address(mut self, address: &str) -> VitrineResult<Self> {
        self.metadata.put("origin_address", address)?;
        Ok(self)
    }

    pub fn is_unread(&self) -> bool {
        self.status == SubmissionStatus::New
    }
}

impl Convertible for Submission {
    type Output = Submission;

    fn to_value(&self) -> VitrineResult<Value> {
        let mut doc = Document::new();
        put_optional(&mut doc, DOC_ID, self.id)?;
        doc.put(SUBMISSION_TYPE, self.submission_type)?;
        doc.put(STATUS, self.status)?;
        doc.put(NAME, self.name.as_str())?;
        doc.put(EMAIL, self.email.as_str())?;
        put_optional(&mut doc, PHONE, self.phone.as_deref())?;
        put_optional(&mut doc, COMPANY, self.company.as_deref())?;
        put_optional(&mut doc, SUBJECT, self.subject.as_deref())?;
        put_optional(&mut doc, MESSAGE, self.message.as_deref())?;
        doc.put(METADATA, self.metadata.clone())?;
        put_optional(&mut doc, DOC_CREATED_AT, self.created_at)?;
        put_optional(&mut doc, READ_AT, self.read_at)?;
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> VitrineResult<Self::Output> {
        let doc = expect_document(value, "Submission")?;
        Ok(Submission {
            id: doc.id(),
            submission_type: doc.get_as(SUBMISSION_TYPE)?,
            status: doc.get_as(STATUS)?,
            name: doc.get_as(NAME)?,
            email: doc.get_as(EMAIL)?,
            phone: doc.get_as(PHONE)?,
            company: doc.get_as(COMPANY)?,
            subject: doc.get_as(SUBJECT)?,
            message: doc.get_as(MESSAGE)?,
            metadata: doc.get_as(METADATA)?,
            created_at: doc.get_as(DOC_CREATED_AT)?,
            read_at: doc.get_as(READ_AT)?,
        })
    }
}

impl Entity for Submission {
    fn collection_name() -> &'static str {
        "submissions"
    }

    fn entity_name() -> &'static str {
        "Submission"
    }

    fn schema() -> Schema {
        Schema::new()
            .field(
                SUBMISSION_TYPE,
                FieldRule::string()
                    .label("Type")
                    .required()
                    .lowercase()
                    .one_of(&SubmissionType::names()),
            )
            .field(
                STATUS,
                FieldRule::string()
                    .label("Status")
                    .required()
                    .lowercase()
                    .one_of(&SubmissionStatus::names()),
            )
            .field(NAME, FieldRule::string().label("Name").required().max_length(200))
            .field(
                EMAIL,
                FieldRule::string()
                    .label("Email")
                    .required()
                    .lowercase()
                    .max_length(254)
                    .pattern(r"^[^\s@]+@[^\s@]+\.[^\s@]+$", "must be a valid email address"),
            )
            .field(PHONE, FieldRule::string().label("Phone").max_length(50))
            .field(COMPANY, FieldRule::string().label("Company").max_length(200))
            .field(SUBJECT, FieldRule::string().label("Subject").max_length(200))
            .field(MESSAGE, FieldRule::string().label("Message").max_length(5000))
            .field(METADATA, FieldRule::document())
            .field(READ_AT, FieldRule::datetime())
    }

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

/// Optional search dimensions for the submission inbox.
#[derive(Debug, Clone, Default)]
pub struct SubmissionQuery {
    /// Literal substring of the name, email, company, subject or message.
    pub search: Option<String>,
    pub submission_types: Option<Vec<SubmissionType>>,
    pub statuses: Option<Vec<SubmissionStatus>>,
    /// Inclusive bounds on the creation date.
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub page: u64,
    pub limit: Option<u64>,
    pub sort: Option<String>,
}

impl SubmissionQuery {
    fn to_filter(&self) -> VitrineResult<Filter> {
        FilterComposer::new()
            .search(
                self.search.as_deref(),
                &[NAME, EMAIL, COMPANY, SUBJECT, MESSAGE],
            )
            .any_of(SUBMISSION_TYPE, self.submission_types.clone())
            .any_of(STATUS, self.statuses.clone())
            .range(DOC_CREATED_AT, self.created_from, self.created_to)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionStats {
    pub total: u64,
    pub by_status: BTreeMap<SubmissionStatus, u64>,
    pub by_type: BTreeMap<SubmissionType, u64>,
}

/// Inbox repository for inbound submissions.
#[derive(Clone)]
pub struct SubmissionRepository {
    repository: Repository<Submission>,
}

impl SubmissionRepository {
    pub fn new(connection: Connection) -> Self {
        SubmissionRepository {
            repository: Repository::new(connection),
        }
    }

    pub fn repository(&self) -> &Repository<Submission> {
        &self.repository
    }

    /// Stores a new submission as unread.
    pub async fn create(&self, mut submission: Submission) -> VitrineResult<Submission> {
        submission.status = SubmissionStatus::New;
        submission.read_at = None;
        self.repository.create(submission).await
    }

    pub async fn find_by_id<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<Submission>> {
        self.repository.find_by_id(id).await
    }

    pub async fn find_with_filters(&self, query: &SubmissionQuery) -> VitrineResult<Paginated<Submission>> {
        self.repository
            .find_paginated(query.to_filter()?, query.page, query.limit, query.sort.as_deref())
            .await
    }

    /// Marks a new submission read, stamping `read_at` the first time only.
    ///
    /// Archived submissions stay archived and are returned unchanged.
    pub async fn mark_read<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<Submission>> {
        let id = match id.into().resolve()? {
            Some(id) => id,
            None => return Ok(None),
        };
        let update = Update::new()
            .set(STATUS, SubmissionStatus::Read)
            .set_if_absent(READ_AT, now());
        let filter = and(vec![by_id(id), field(STATUS).ne(SubmissionStatus::Archived)]);
        match self
            .repository
            .update_one(filter, update, UpdateOptions::default())
            .await?
        {
            Some(submission) => Ok(Some(submission)),
            None => self.repository.find_by_id(id).await,
        }
    }

    /// Archives a submission; an unread one is stamped read as well.
    pub async fn archive<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<Submission>> {
        let update = Update::new()
            .set(STATUS, SubmissionStatus::Archived)
            .set_if_absent(READ_AT, now());
        self.repository
            .update_by_id(id, update, UpdateOptions::default())
            .await
    }

    /// Marks every listed new submission read with one batched write.
    pub async fn mark_many_read(&self, ids: &[RecordId]) -> VitrineResult<WriteResult> {
        if ids.is_empty() {
            return Ok(WriteResult::new(0, 0));
        }
        let filter = and(vec![
            field(DOC_ID).in_values(ids.to_vec()),
            field(STATUS).eq(SubmissionStatus::New),
        ]);
        let update = Update::new()
            .set(STATUS, SubmissionStatus::Read)
            .set_if_absent(READ_AT, now());
        self.repository.update_many(filter, update).await
    }

    pub async fn count_unread(&self) -> VitrineResult<u64> {
        self.repository
            .count(field(STATUS).eq(SubmissionStatus::New))
            .await
    }

    /// The `limit` newest submissions, capped at the configured page maximum.
    pub async fn recent(&self, limit: u64) -> VitrineResult<Vec<Submission>> {
        let limit = limit.clamp(1, self.repository.config().max_page_limit());
        let options = FindOptions::new()
            .sort(with_id_tiebreaker(parse_sort("-created_at")?))
            .limit(limit);
        self.repository.find_all(Filter::All, options).await
    }

    pub async fn delete<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<Submission>> {
        self.repository.delete_by_id(id).await
    }

    /// Counts by status and by type, one aggregation pass each.
    pub async fn stats(&self) -> VitrineResult<SubmissionStats> {
        let (statuses, types) = tokio::try_join!(
            self.repository.count_by(Filter::All, STATUS),
            self.repository.count_by(Filter::All, SUBMISSION_TYPE)
        )?;
        let by_status = tally(statuses, SubmissionStatus::ALL);
        Ok(SubmissionStats {
            total: by_status.values().sum(),
            by_status,
            by_type: tally(types, SubmissionType::ALL),
        })
    }
}
