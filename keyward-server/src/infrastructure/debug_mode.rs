use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Общий флаг debug-режима.
///
/// Клоны разделяют одно значение: перезагрузка конфигурации меняет его, а
/// middleware рендеринга читает при каждом ответе. Запрос, который уже
/// выполняется во время переключения, может увидеть любое из значений.
#[derive(Debug, Clone, Default)]
pub struct DebugMode(Arc<AtomicBool>);

impl DebugMode {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Возвращает предыдущее значение.
    pub fn set(&self, enabled: bool) -> bool {
        self.0.swap(enabled, Ordering::Relaxed)
    }
}
