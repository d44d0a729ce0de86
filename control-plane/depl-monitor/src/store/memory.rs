//! In-process store with API-server-like write semantics.
//!
//! Writes are checked against `resourceVersion`; deleting an object that
//! still carries finalizers only marks it with a deletion timestamp. Owned
//! objects are never garbage-collected, so the reconciler's explicit delete
//! branch is the only cleanup mechanism here.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::chrono::Utc;
use kube::Resource;
use tokio::sync::Mutex;

use super::{Deletion, ObjectKey, ObjectStore, StatusSubresource, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
    Get,
    Create,
    Update,
    Delete,
    UpdateStatus,
}

struct Inner<K> {
    objects: BTreeMap<ObjectKey, K>,
    revision: u64,
    faults: HashMap<Op, VecDeque<StoreError>>,
    journal: Vec<(Op, ObjectKey)>,
}

impl<K> Inner<K> {
    fn next_revision(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }

    fn take_fault(&mut self, op: Op) -> Result<(), StoreError> {
        match self.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub struct MemoryStore<K> {
    inner: Mutex<Inner<K>>,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                objects: BTreeMap::new(),
                revision: 0,
                faults: HashMap::new(),
                journal: Vec::new(),
            }),
        }
    }
}

impl<K> MemoryStore<K>
where
    K: Resource + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `obj` as an outside actor would: no version check and no
    /// journal entry. Assigns a uid on first write.
    pub async fn put(&self, obj: K) -> K {
        let mut inner = self.inner.lock().await;
        let key = ObjectKey::of(&obj);
        let mut obj = obj;
        let rv = inner.next_revision();
        let prior_uid = inner
            .objects
            .get(&key)
            .and_then(|o| o.meta().uid.clone());
        let meta = obj.meta_mut();
        meta.namespace = Some(key.namespace.clone());
        meta.resource_version = Some(rv.clone());
        if meta.uid.is_none() {
            meta.uid = prior_uid.or(Some(format!("uid-{rv}")));
        }
        inner.objects.insert(key, obj.clone());
        obj
    }

    /// Purges an object regardless of finalizers.
    pub async fn remove(&self, key: &ObjectKey) -> Option<K> {
        self.inner.lock().await.objects.remove(key)
    }

    pub async fn peek(&self, key: &ObjectKey) -> Option<K> {
        self.inner.lock().await.objects.get(key).cloned()
    }

    /// Makes the next call of `op` fail with `err`. Faults queue up per op.
    pub async fn fail_next(&self, op: Op, err: StoreError) {
        self.inner
            .lock()
            .await
            .faults
            .entry(op)
            .or_default()
            .push_back(err);
    }

    /// Successful writes issued through [`ObjectStore`], oldest first.
    pub async fn journal(&self) -> Vec<(Op, ObjectKey)> {
        self.inner.lock().await.journal.clone()
    }

    pub async fn clear_journal(&self) {
        self.inner.lock().await.journal.clear();
    }
}

fn check_version<K: Resource>(
    stored: &K,
    incoming: &K,
    key: &ObjectKey,
) -> Result<(), StoreError> {
    match incoming.meta().resource_version.as_deref() {
        Some(rv) if Some(rv) != stored.meta().resource_version.as_deref() => {
            Err(StoreError::Conflict(format!("{key}: stale resourceVersion {rv}")))
        }
        _ => Ok(()),
    }
}

fn has_finalizers<K: Resource>(obj: &K) -> bool {
    obj.meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| !f.is_empty())
}

#[async_trait]
impl<K> ObjectStore<K> for MemoryStore<K>
where
    K: Resource + StatusSubresource + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.take_fault(Op::Get)?;
        Ok(inner.objects.get(key).cloned())
    }

    async fn create(&self, obj: &K) -> Result<K, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.take_fault(Op::Create)?;
        let key = ObjectKey::of(obj);
        if inner.objects.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{key} already exists")));
        }
        let rv = inner.next_revision();
        let mut created = obj.clone();
        let meta = created.meta_mut();
        meta.namespace = Some(key.namespace.clone());
        meta.resource_version = Some(rv.clone());
        meta.uid = Some(format!("uid-{rv}"));
        meta.deletion_timestamp = None;
        inner.objects.insert(key.clone(), created.clone());
        inner.journal.push((Op::Create, key));
        Ok(created)
    }

    async fn update(&self, obj: &K) -> Result<K, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.take_fault(Op::Update)?;
        let key = ObjectKey::of(obj);
        let Some(stored) = inner.objects.get(&key).cloned() else {
            return Err(StoreError::Conflict(format!("{key} no longer exists")));
        };
        check_version(&stored, obj, &key)?;
        let rv = inner.next_revision();
        let mut updated = obj.clone();
        updated.copy_status_from(&stored);
        let meta = updated.meta_mut();
        meta.uid = stored.meta().uid.clone();
        meta.deletion_timestamp = stored.meta().deletion_timestamp.clone();
        meta.resource_version = Some(rv);
        inner.journal.push((Op::Update, key.clone()));
        if updated.meta().deletion_timestamp.is_some() && !has_finalizers(&updated)
        {
            inner.objects.remove(&key);
        } else {
            inner.objects.insert(key, updated.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<Deletion, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.take_fault(Op::Delete)?;
        let Some(stored) = inner.objects.get(key).cloned() else {
            return Ok(Deletion::AlreadyGone);
        };
        if !has_finalizers(&stored) {
            inner.objects.remove(key);
        } else if stored.meta().deletion_timestamp.is_none() {
            let rv = inner.next_revision();
            let mut marked = stored;
            marked.meta_mut().deletion_timestamp = Some(Time(Utc::now()));
            marked.meta_mut().resource_version = Some(rv);
            inner.objects.insert(key.clone(), marked);
        } else {
            // Already marked; nothing changes.
            return Ok(Deletion::Deleted);
        }
        inner.journal.push((Op::Delete, key.clone()));
        Ok(Deletion::Deleted)
    }

    async fn update_status(&self, obj: &K) -> Result<K, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.take_fault(Op::UpdateStatus)?;
        let key = ObjectKey::of(obj);
        let Some(mut stored) = inner.objects.get(&key).cloned() else {
            return Err(StoreError::Conflict(format!("{key} no longer exists")));
        };
        check_version(&stored, obj, &key)?;
        let rv = inner.next_revision();
        stored.copy_status_from(obj);
        stored.meta_mut().resource_version = Some(rv);
        inner.objects.insert(key.clone(), stored.clone());
        inner.journal.push((Op::UpdateStatus, key));
        Ok(stored)
    }
}
