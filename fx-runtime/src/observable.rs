//! # Observable 模块
//!
//! 带修订号的只读状态单元。
//!
//! 组件对外暴露的状态（可见性、transform、进度、激活标记）都是 `Observable`，
//! Host 通过比较修订号判断是否需要重新渲染。

/// 可观察值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observable<T> {
    value: T,
    revision: u64,
}

impl<T: PartialEq> Observable<T> {
    pub fn new(value: T) -> Self {
        Self { value, revision: 0 }
    }

    /// 当前值
    pub fn get(&self) -> &T {
        &self.value
    }

    /// 修订号（每次值真正改变时 +1）
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// 写入新值，返回是否发生变化
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.revision += 1;
        true
    }
}

impl<T: Copy + PartialEq> Observable<T> {
    /// 复制出当前值
    pub fn value(&self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_only_on_change() {
        let mut flag = Observable::new(false);
        assert!(!flag.set(false));
        assert_eq!(flag.revision(), 0);

        assert!(flag.set(true));
        assert!(flag.value());
        assert_eq!(flag.revision(), 1);
    }

    #[test]
    fn test_string_value() {
        let mut transform = Observable::new(String::new());
        transform.set("translateY(10px)".to_string());
        assert_eq!(transform.get(), "translateY(10px)");
    }
}
