//! Book list in canonical order with chapter counts.

use crate::error::CatalogError;

/// A book and how many chapters it has
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Book {
    pub name: &'static str,
    pub chapters: u32,
}

const fn book(name: &'static str, chapters: u32) -> Book {
    Book { name, chapters }
}

pub const OLD_TESTAMENT_BOOKS: [Book; 39] = [
    book("창세기", 50),
    book("출애굽기", 40),
    book("레위기", 27),
    book("민수기", 36),
    book("신명기", 34),
    book("여호수아", 24),
    book("사사기", 21),
    book("룻기", 4),
    book("사무엘상", 31),
    book("사무엘하", 24),
    book("열왕기상", 22),
    book("열왕기하", 25),
    book("역대상", 29),
    book("역대하", 36),
    book("에스라", 10),
    book("느헤미야", 13),
    book("에스더", 10),
    book("욥기", 42),
    book("시편", 150),
    book("잠언", 31),
    book("전도서", 12),
    book("아가", 8),
    book("이사야", 66),
    book("예레미야", 52),
    book("예레미야애가", 5),
    book("에스겔", 48),
    book("다니엘", 12),
    book("호세아", 14),
    book("요엘", 3),
    book("아모스", 9),
    book("오바댜", 1),
    book("요나", 4),
    book("미가", 7),
    book("나훔", 3),
    book("하박국", 3),
    book("스바냐", 3),
    book("학개", 2),
    book("스가랴", 14),
    book("말라기", 4),
];

pub const NEW_TESTAMENT_BOOKS: [Book; 27] = [
    book("마태복음", 28),
    book("마가복음", 16),
    book("누가복음", 24),
    book("요한복음", 21),
    book("사도행전", 28),
    book("로마서", 16),
    book("고린도전서", 16),
    book("고린도후서", 13),
    book("갈라디아서", 6),
    book("에베소서", 6),
    book("빌립보서", 4),
    book("골로새서", 4),
    book("데살로니가전서", 5),
    book("데살로니가후서", 3),
    book("디모데전서", 6),
    book("디모데후서", 4),
    book("디도서", 3),
    book("빌레몬서", 1),
    book("히브리서", 13),
    book("야고보서", 5),
    book("베드로전서", 5),
    book("베드로후서", 3),
    book("요한일서", 5),
    book("요한이서", 1),
    book("요한삼서", 1),
    book("유다서", 1),
    book("요한계시록", 22),
];

/// All books, Old Testament first
pub fn all_books() -> impl Iterator<Item = &'static Book> {
    OLD_TESTAMENT_BOOKS.iter().chain(NEW_TESTAMENT_BOOKS.iter())
}

pub fn find_book(name: &str) -> Option<&'static Book> {
    let name = name.trim();
    all_books().find(|b| b.name == name)
}

pub fn is_old_testament(name: &str) -> bool {
    OLD_TESTAMENT_BOOKS.iter().any(|b| b.name == name.trim())
}

/// Total number of chapters across all books
pub fn total_chapters() -> u32 {
    all_books().map(|b| b.chapters).sum()
}

/// Check that a chapter exists and return its book
pub fn validate(name: &str, chapter: u32) -> Result<&'static Book, CatalogError> {
    let book = find_book(name).ok_or_else(|| CatalogError::UnknownBook {
        book: name.to_string(),
    })?;

    if chapter == 0 || chapter > book.chapters {
        return Err(CatalogError::ChapterOutOfRange {
            book: book.name.to_string(),
            chapter,
            chapters: book.chapters,
        });
    }

    Ok(book)
}

/// The chapter after the given one, rolling into the next book.
/// Returns None after the final chapter of the final book.
pub fn next_chapter(name: &str, chapter: u32) -> Result<Option<(&'static Book, u32)>, CatalogError> {
    let current = validate(name, chapter)?;

    if chapter < current.chapters {
        return Ok(Some((current, chapter + 1)));
    }

    let mut books = all_books().skip_while(|b| b.name != current.name);
    books.next();
    Ok(books.next().map(|next| (next, 1)))
}

pub fn is_last_chapter(name: &str, chapter: u32) -> bool {
    matches!(next_chapter(name, chapter), Ok(None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_counts() {
        assert_eq!(all_books().count(), 66);
        assert_eq!(total_chapters(), 1189);
    }

    #[test]
    fn test_find_book() {
        assert_eq!(find_book("시편").map(|b| b.chapters), Some(150));
        assert_eq!(find_book(" 룻기 ").map(|b| b.chapters), Some(4));
        assert!(find_book("Genesis").is_none());
    }

    #[test]
    fn test_testament() {
        assert!(is_old_testament("말라기"));
        assert!(!is_old_testament("마태복음"));
    }

    #[test]
    fn test_validate() {
        assert!(validate("창세기", 50).is_ok());
        assert_eq!(
            validate("창세기", 51),
            Err(CatalogError::ChapterOutOfRange {
                book: "창세기".to_string(),
                chapter: 51,
                chapters: 50,
            })
        );
        assert!(validate("창세기", 0).is_err());
        assert!(matches!(validate("없는책", 1), Err(CatalogError::UnknownBook { .. })));
    }

    #[test]
    fn test_next_chapter_within_book() {
        let (book, chapter) = next_chapter("창세기", 1).unwrap().unwrap();
        assert_eq!(book.name, "창세기");
        assert_eq!(chapter, 2);
    }

    #[test]
    fn test_next_chapter_crosses_books_and_testaments() {
        let (book, chapter) = next_chapter("창세기", 50).unwrap().unwrap();
        assert_eq!((book.name, chapter), ("출애굽기", 1));

        let (book, chapter) = next_chapter("말라기", 4).unwrap().unwrap();
        assert_eq!((book.name, chapter), ("마태복음", 1));
    }

    #[test]
    fn test_last_chapter() {
        assert_eq!(next_chapter("요한계시록", 22).unwrap(), None);
        assert!(is_last_chapter("요한계시록", 22));
        assert!(!is_last_chapter("요한계시록", 21));
    }
}
