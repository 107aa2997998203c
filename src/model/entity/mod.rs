mod user;
pub use user::{UserEntity, UserEntityCreateUpdate};

mod course;
pub use course::{Course, CourseKind, CourseStructure, LessonNode, SectionNode};

mod enrollment;
pub use enrollment::CourseEnrollment;

mod progress;
pub use progress::CourseProgress;

mod quiz;
pub use quiz::QuizQuestion;

mod quiz_result;
pub use quiz_result::{QuestionOutcome, QuizResult, QuizResultCreate};

mod session;
pub use session::CourseSession;

mod order;
pub use order::{Order, OrderCreate, OrderItem, OrderItemKind, OrderStatus};

mod audit;
pub use audit::PaymentAudit;
